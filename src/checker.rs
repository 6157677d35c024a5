use std::collections::HashMap;
use std::path::PathBuf;

use crate::options::{self, LedgerOptions, KEY_OPERATING_CURRENCY};
use crate::parse::{
    CloseDirective, CommodityDirective, Directive, EventDirective, NoteDirective, OpenDirective,
    OptionDirective, PriceDirective,
};
use crate::{
    Account, AccountInfo, AccountNote, AccountStatus, AccountType, Commodity, Currency, Date,
    Error, ErrorKind, EventInfo, Ledger, Meta, PriceInfo, Source,
};

/// Folds the ordered directive stream into a [`Ledger`], left to right.
/// The first directive the registry rejects aborts the whole build.
pub(crate) fn build(directives: Vec<Directive>, files: Vec<PathBuf>) -> Result<Ledger, Error> {
    let mut builder = Builder::default();
    for directive in directives {
        builder.fold(directive)?;
    }
    Ok(builder.finish(files))
}

#[derive(Default)]
struct Builder {
    options: HashMap<String, (String, Source)>,
    typed: LedgerOptions,
    accounts: HashMap<Account, AccountInfo>,
    aliases: HashMap<String, Account>,
    commodities: HashMap<Currency, Commodity>,
    events: HashMap<String, Vec<EventInfo>>,
    prices: Vec<PriceInfo>,
    // commodity symbols referenced without a `commodity` directive, keyed to
    // their first use site
    used_commodities: HashMap<Currency, Source>,
}

impl Builder {
    fn fold(&mut self, directive: Directive) -> Result<(), Error> {
        match directive {
            Directive::Option(option) => self.fold_option(option),
            Directive::Commodity(commodity) => self.fold_commodity(commodity),
            Directive::Open(open) => self.fold_open(open),
            Directive::Close(close) => self.fold_close(close),
            Directive::Note(note) => self.fold_note(note, false),
            Directive::Document(doc) => self.fold_note(doc, true),
            Directive::Event(event) => self.fold_event(event),
            Directive::Price(price) => self.fold_price(price),
            // includes are expanded by the resolver before folding
            Directive::Include(_) => Ok(()),
        }
    }

    fn fold_option(&mut self, option: OptionDirective) -> Result<(), Error> {
        let OptionDirective { key, value, src } = option;
        self.typed.apply(&key, &value, &src)?;
        if key == KEY_OPERATING_CURRENCY {
            self.used_commodities
                .entry(value.clone())
                .or_insert_with(|| src.clone());
        }
        // last write wins
        self.options.insert(key, (value, src));
        Ok(())
    }

    fn fold_commodity(&mut self, commodity: CommodityDirective) -> Result<(), Error> {
        let CommodityDirective {
            date: _,
            name,
            meta,
            src,
        } = commodity;
        if self.commodities.contains_key(&name) {
            return Err(Error {
                kind: ErrorKind::DuplicateCommodity { name },
                src,
            });
        }
        let precision = match meta.get("precision") {
            Some((value, attr_src)) => value
                .parse::<u32>()
                .map_err(|_| options::invalid_value("precision", value, attr_src))?,
            None => self.typed.default_commodity_precision,
        };
        let rounding = match meta.get("rounding") {
            Some((value, attr_src)) => value
                .parse()
                .map_err(|_| options::invalid_value("rounding", value, attr_src))?,
            None => self.typed.default_rounding,
        };
        let prefix = meta.get("prefix").map(|(value, _)| value.clone());
        let suffix = meta.get("suffix").map(|(value, _)| value.clone());
        self.commodities.insert(
            name.clone(),
            Commodity {
                name,
                precision,
                prefix,
                suffix,
                rounding,
                meta,
                src,
            },
        );
        Ok(())
    }

    fn fold_open(&mut self, open: OpenDirective) -> Result<(), Error> {
        let OpenDirective {
            date,
            account,
            currencies,
            meta,
            src,
        } = open;
        if self.accounts.contains_key(&account) {
            return Err(Error {
                kind: ErrorKind::DuplicateAccount {
                    name: account.to_string(),
                },
                src,
            });
        }
        let alias = meta.get("alias").map(|(value, _)| value.clone());
        if let Some(alias) = &alias {
            if self.aliases.contains_key(alias) {
                return Err(Error {
                    kind: ErrorKind::DuplicateAlias {
                        alias: alias.clone(),
                    },
                    src,
                });
            }
        }
        for currency in &currencies {
            self.used_commodities
                .entry(currency.clone())
                .or_insert_with(|| src.clone());
        }
        let info = AccountInfo {
            name: account.clone(),
            account_type: AccountType::from_name(&account),
            status: AccountStatus::Open,
            alias: alias.clone(),
            open: (date, src),
            close: None,
            currencies,
            notes: Vec::new(),
            docs: Vec::new(),
            meta,
        };
        if let Some(alias) = alias {
            self.aliases.insert(alias, account.clone());
        }
        self.accounts.insert(account, info);
        Ok(())
    }

    fn fold_close(&mut self, close: CloseDirective) -> Result<(), Error> {
        let CloseDirective { date, account, src } = close;
        let info = match self.accounts.get_mut(&account) {
            Some(info) => info,
            None => {
                return Err(Error {
                    kind: ErrorKind::UnknownAccount {
                        name: account.to_string(),
                    },
                    src,
                })
            }
        };
        if info.status == AccountStatus::Closed {
            return Err(Error {
                kind: ErrorKind::AlreadyClosed {
                    name: account.to_string(),
                },
                src,
            });
        }
        if date < info.open.0 {
            return Err(Error {
                kind: ErrorKind::AccountNotActive {
                    name: account.to_string(),
                },
                src,
            });
        }
        info.status = AccountStatus::Closed;
        info.close = Some((date, src));
        Ok(())
    }

    /// Looks up an account that must be active on `date`: opened no later
    /// than `date` and, if closed, closed no earlier than `date`.
    fn active_account_mut(
        &mut self,
        account: &Account,
        date: Date,
        src: &Source,
    ) -> Result<&mut AccountInfo, Error> {
        let info = match self.accounts.get_mut(account) {
            Some(info) => info,
            None => {
                return Err(Error {
                    kind: ErrorKind::UnknownAccount {
                        name: account.to_string(),
                    },
                    src: src.clone(),
                })
            }
        };
        let closed_at = info.close.as_ref().map(|(close_date, _)| *close_date);
        if date < info.open.0 || closed_at.map_or(false, |close_date| date > close_date) {
            return Err(Error {
                kind: ErrorKind::AccountNotActive {
                    name: account.to_string(),
                },
                src: src.clone(),
            });
        }
        Ok(info)
    }

    fn fold_note(&mut self, note: NoteDirective, is_doc: bool) -> Result<(), Error> {
        let NoteDirective {
            date,
            account,
            val,
            src,
        } = note;
        let info = self.active_account_mut(&account, date, &src)?;
        let record = AccountNote { date, val, src };
        if is_doc {
            info.docs.push(record);
        } else {
            info.notes.push(record);
        }
        Ok(())
    }

    fn fold_event(&mut self, event: EventDirective) -> Result<(), Error> {
        let EventDirective {
            date,
            key,
            value,
            src,
        } = event;
        self.events
            .entry(key)
            .or_insert_with(Vec::new)
            .push((date, value, src).into());
        Ok(())
    }

    fn fold_price(&mut self, price: PriceDirective) -> Result<(), Error> {
        let PriceDirective {
            date,
            commodity,
            amount,
            src,
        } = price;
        self.used_commodities
            .entry(commodity.clone())
            .or_insert_with(|| src.clone());
        self.used_commodities
            .entry(amount.currency.clone())
            .or_insert_with(|| src.clone());
        self.prices.push(PriceInfo {
            date,
            commodity,
            amount,
            src,
        });
        Ok(())
    }

    /// Synthesizes a default record for every commodity symbol that was used
    /// but never declared, then freezes the state into a [`Ledger`].
    fn finish(mut self, files: Vec<PathBuf>) -> Ledger {
        for (name, src) in self.used_commodities {
            if self.commodities.contains_key(&name) {
                continue;
            }
            self.commodities.insert(
                name.clone(),
                Commodity {
                    name,
                    precision: self.typed.default_commodity_precision,
                    prefix: None,
                    suffix: None,
                    rounding: self.typed.default_rounding,
                    meta: Meta::new(),
                    src,
                },
            );
        }
        Ledger {
            options: self.options,
            accounts: self.accounts,
            commodities: self.commodities,
            aliases: self.aliases,
            events: self.events,
            prices: self.prices,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parser;
    use crate::Rounding;
    use std::sync::Arc;

    fn build_str(text: &str) -> Result<Ledger, Error> {
        let directives = Parser::parse(text, Arc::new("test".to_string()))?;
        build(directives, Vec::new())
    }

    #[test]
    fn folds_a_minimal_ledger() {
        let ledger = build_str(
            "option \"title\" \"Test\"\n\
             2023-01-01 open Assets:Bank\n\
             2023-01-01 commodity USD\n  precision: \"2\"\n",
        )
        .unwrap();
        assert_eq!(ledger.options()["title"].0, "Test");
        let account = &ledger.accounts()[&Arc::new("Assets:Bank".to_string())];
        assert_eq!(account.account_type, AccountType::Assets);
        assert_eq!(account.status(), AccountStatus::Open);
        assert_eq!(account.alias, None);
        assert_eq!(ledger.commodities()["USD"].precision(), 2);
    }

    #[test]
    fn option_last_write_wins() {
        let ledger = build_str(
            "option \"title\" \"One\"\noption \"title\" \"Two\"\n",
        )
        .unwrap();
        assert_eq!(ledger.options()["title"].0, "Two");
    }

    #[test]
    fn duplicate_open_fails() {
        let err = build_str(
            "2023-01-01 open Assets:Bank\n2023-02-01 open Assets:Bank\n  alias: \"b\"\n",
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::DuplicateAccount {
                name: "Assets:Bank".to_string()
            }
        );
    }

    #[test]
    fn duplicate_alias_fails() {
        let err = build_str(
            "2023-01-01 open Assets:Bank\n  alias: \"b\"\n\
             2023-01-01 open Assets:Cash\n  alias: \"b\"\n",
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::DuplicateAlias {
                alias: "b".to_string()
            }
        );
    }

    #[test]
    fn close_lifecycle_errors() {
        let err = build_str("2023-01-01 close Assets:Bank\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownAccount { .. }));

        let err = build_str(
            "2023-01-01 open Assets:Bank\n\
             2023-02-01 close Assets:Bank\n\
             2023-03-01 close Assets:Bank\n",
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AlreadyClosed { .. }));

        let err = build_str(
            "2023-02-01 open Assets:Bank\n2023-01-01 close Assets:Bank\n",
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AccountNotActive { .. }));
    }

    #[test]
    fn note_outside_active_range_fails() {
        let err = build_str(
            "2023-02-01 open Assets:Bank\n2023-01-01 note Assets:Bank \"early\"\n",
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AccountNotActive { .. }));

        let err = build_str(
            "2023-01-01 open Assets:Bank\n\
             2023-02-01 close Assets:Bank\n\
             2023-03-01 document Assets:Bank \"late.pdf\"\n",
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AccountNotActive { .. }));
    }

    #[test]
    fn notes_and_documents_attach_to_accounts() {
        let ledger = build_str(
            "2023-01-01 open Assets:Bank\n\
             2023-01-02 note Assets:Bank \"statement arrived\"\n\
             2023-01-03 document Assets:Bank \"jan.pdf\"\n",
        )
        .unwrap();
        let account = &ledger.accounts()[&Arc::new("Assets:Bank".to_string())];
        assert_eq!(account.notes().len(), 1);
        assert_eq!(account.docs()[0].val, "jan.pdf");
    }

    #[test]
    fn duplicate_commodity_fails() {
        let err = build_str(
            "2023-01-01 commodity USD\n2023-02-01 commodity USD\n",
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::DuplicateCommodity {
                name: "USD".to_string()
            }
        );
    }

    #[test]
    fn commodity_attributes_are_parsed() {
        let ledger = build_str(
            "2023-01-01 commodity BTC\n  precision: \"8\"\n  suffix: \"BTC\"\n  rounding: \"RoundHalfEven\"\n",
        )
        .unwrap();
        let commodity = &ledger.commodities()["BTC"];
        assert_eq!(commodity.precision(), 8);
        assert_eq!(commodity.suffix().as_deref(), Some("BTC"));
        assert_eq!(commodity.rounding(), Rounding::RoundHalfEven);
        assert_eq!(commodity.prefix(), &None);
    }

    #[test]
    fn bad_commodity_attribute_fails() {
        let err = build_str(
            "2023-01-01 commodity USD\n  precision: \"two\"\n",
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidOptionValue { .. }));
    }

    #[test]
    fn used_commodities_are_synthesized_with_defaults() {
        let ledger = build_str(
            "option \"default_commodity_precision\" \"4\"\n\
             option \"default_rounding\" \"RoundHalfUp\"\n\
             2023-01-01 open Assets:Bank USD\n",
        )
        .unwrap();
        let commodity = &ledger.commodities()["USD"];
        assert_eq!(commodity.precision(), 4);
        assert_eq!(commodity.rounding(), Rounding::RoundHalfUp);
    }

    #[test]
    fn declared_commodities_are_not_resynthesized() {
        let ledger = build_str(
            "2023-01-01 commodity USD\n  precision: \"3\"\n\
             2023-01-02 open Assets:Bank USD\n",
        )
        .unwrap();
        assert_eq!(ledger.commodities()["USD"].precision(), 3);
        assert_eq!(ledger.commodities().len(), 1);
    }

    #[test]
    fn price_legs_count_as_used_commodities() {
        let ledger = build_str("2023-01-01 price USD 7.1 CNY\n").unwrap();
        assert_eq!(ledger.prices().len(), 1);
        assert!(ledger.commodities().contains_key("USD"));
        assert!(ledger.commodities().contains_key("CNY"));
    }

    #[test]
    fn events_group_by_key() {
        let ledger = build_str(
            "2023-01-01 event \"location\" \"Berlin\"\n\
             2023-03-01 event \"location\" \"Lisbon\"\n",
        )
        .unwrap();
        assert_eq!(ledger.events()["location"].len(), 2);
        assert_eq!(ledger.events()["location"][1].desc, "Lisbon");
    }

    #[test]
    fn alias_index_is_built() {
        let ledger = build_str(
            "2023-01-01 open Assets:Bank:Checking\n  alias: \"checking\"\n",
        )
        .unwrap();
        let account = ledger.account_by_alias("checking").unwrap();
        assert_eq!(account.name().as_str(), "Assets:Bank:Checking");
        assert!(ledger.account_by_alias("savings").is_none());
    }

    #[test]
    fn operating_currency_is_synthesized() {
        let ledger = build_str("option \"operating_currency\" \"EUR\"\n").unwrap();
        assert_eq!(ledger.commodities()["EUR"].precision(), 2);
    }
}

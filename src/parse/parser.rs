use super::lexer::Lexer;
use super::token::Token;
use crate::{
    Account, Amount, Currency, Date, Decimal, Error, ErrorKind, Location, Meta, Source, SrcFile,
};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One parsed instruction from a ledger file. Parsing is side-effect-free:
/// a directive records what the file says, not whether the registry accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Option(OptionDirective),
    Commodity(CommodityDirective),
    Open(OpenDirective),
    Close(CloseDirective),
    Include(IncludeDirective),
    Note(NoteDirective),
    Document(DocumentDirective),
    Event(EventDirective),
    Price(PriceDirective),
}

impl Directive {
    pub fn src(&self) -> &Source {
        match self {
            Directive::Option(d) => &d.src,
            Directive::Commodity(d) => &d.src,
            Directive::Open(d) => &d.src,
            Directive::Close(d) => &d.src,
            Directive::Include(d) => &d.src,
            Directive::Note(d) => &d.src,
            Directive::Document(d) => &d.src,
            Directive::Event(d) => &d.src,
            Directive::Price(d) => &d.src,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDirective {
    pub key: String,
    pub value: String,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommodityDirective {
    pub date: Date,
    pub name: Currency,
    pub meta: Meta,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDirective {
    pub date: Date,
    pub account: Account,
    pub currencies: HashSet<Currency>,
    pub meta: Meta,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDirective {
    pub date: Date,
    pub account: Account,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub path: String,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDirective {
    pub date: Date,
    pub account: Account,
    pub val: String,
    pub src: Source,
}

pub type DocumentDirective = NoteDirective;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDirective {
    pub date: Date,
    pub key: String,
    pub value: String,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceDirective {
    pub date: Date,
    pub commodity: Currency,
    pub amount: Amount,
    pub src: Source,
}

pub struct Parser<'source> {
    lexer: Lexer<'source>,
    file: SrcFile,
    accounts: HashMap<&'source str, Account>,
}

impl<'source> Parser<'source> {
    /// Parses the text of one ledger file into its directives, in line order.
    /// The first malformed directive aborts the parse.
    pub fn parse(text: &'source str, file: SrcFile) -> Result<Vec<Directive>, Error> {
        let mut parser = Parser {
            lexer: Lexer::new(text, file.clone()),
            file,
            accounts: HashMap::new(),
        };
        parser.parse_directives()
    }

    fn src_from(&self, start: Location) -> Source {
        Source {
            start,
            end: self.lexer.last_token_end(),
            file: self.file.clone(),
        }
    }

    fn unexpected(&self, token: Token, text: &str, expected: &str) -> Error {
        Error {
            kind: ErrorKind::Syntax {
                expected: expected.to_string(),
                found: format!("{:?}({})", token, text),
            },
            src: Source {
                file: self.file.clone(),
                start: self.lexer.location(),
                end: self.lexer.location().advance(text.chars().count()),
            },
        }
    }

    fn parse_directives(&mut self) -> Result<Vec<Directive>, Error> {
        let mut directives = Vec::new();
        while let Some((token, text)) = self.lexer.peek_opt()? {
            let directive = match token {
                Token::Option => self.parse_option()?,
                Token::Include => self.parse_include()?,
                Token::Date => self.parse_dated_entry()?,
                _ => return Err(self.unexpected(token, text, "a directive")),
            };
            directives.push(directive);
        }
        Ok(directives)
    }

    fn parse_option(&mut self) -> Result<Directive, Error> {
        let start = self.lexer.location();
        self.lexer.take(Token::Option)?;
        let key = self.parse_string()?;
        let value = self.parse_string()?;
        Ok(Directive::Option(OptionDirective {
            key,
            value,
            src: self.src_from(start),
        }))
    }

    fn parse_include(&mut self) -> Result<Directive, Error> {
        let start = self.lexer.location();
        self.lexer.take(Token::Include)?;
        let path = self.parse_string()?;
        Ok(Directive::Include(IncludeDirective {
            path,
            src: self.src_from(start),
        }))
    }

    fn parse_dated_entry(&mut self) -> Result<Directive, Error> {
        let start = self.lexer.location();
        let date = self.parse_date()?;
        let (token, text) = self.lexer.peek()?;
        match token {
            Token::Open => self.parse_open(start, date),
            Token::Close => self.parse_close(start, date),
            Token::Commodity => self.parse_commodity(start, date),
            Token::Note => self.parse_note(start, date),
            Token::Document => self.parse_document(start, date),
            Token::Event => self.parse_event(start, date),
            Token::Price => self.parse_price(start, date),
            _ => Err(self.unexpected(token, text, "a dated directive keyword")),
        }
    }

    fn parse_open(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Open)?;
        let account = self.parse_account()?;
        let currencies = self.parse_currency_set()?;
        let meta = self.parse_meta()?;
        Ok(Directive::Open(OpenDirective {
            date,
            account,
            currencies,
            meta,
            src: self.src_from(start),
        }))
    }

    fn parse_close(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Close)?;
        let account = self.parse_account()?;
        Ok(Directive::Close(CloseDirective {
            date,
            account,
            src: self.src_from(start),
        }))
    }

    fn parse_commodity(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Commodity)?;
        let name = self.lexer.take(Token::Currency)?.to_string();
        let meta = self.parse_meta()?;
        Ok(Directive::Commodity(CommodityDirective {
            date,
            name,
            meta,
            src: self.src_from(start),
        }))
    }

    fn parse_note(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Note)?;
        let account = self.parse_account()?;
        let val = self.parse_string()?;
        Ok(Directive::Note(NoteDirective {
            date,
            account,
            val,
            src: self.src_from(start),
        }))
    }

    fn parse_document(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Document)?;
        let account = self.parse_account()?;
        let val = self.parse_string()?;
        Ok(Directive::Document(DocumentDirective {
            date,
            account,
            val,
            src: self.src_from(start),
        }))
    }

    fn parse_event(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Event)?;
        let key = self.parse_string()?;
        let value = self.parse_string()?;
        Ok(Directive::Event(EventDirective {
            date,
            key,
            value,
            src: self.src_from(start),
        }))
    }

    fn parse_price(&mut self, start: Location, date: Date) -> Result<Directive, Error> {
        self.lexer.take(Token::Price)?;
        let commodity = self.lexer.take(Token::Currency)?.to_string();
        let amount = self.parse_amount()?;
        Ok(Directive::Price(PriceDirective {
            date,
            commodity,
            amount,
            src: self.src_from(start),
        }))
    }

    fn parse_account(&mut self) -> Result<Account, Error> {
        let account_str = self.lexer.take(Token::Account)?;
        let account = self
            .accounts
            .entry(account_str)
            .or_insert_with(|| Arc::new(account_str.to_string()))
            .clone();
        Ok(account)
    }

    fn parse_currency_set(&mut self) -> Result<HashSet<Currency>, Error> {
        let mut set = HashSet::new();
        if let Ok(Some((Token::Currency, currency))) = self.lexer.peek_opt() {
            set.insert(currency.to_string());
            self.lexer.consume();
            while let Ok(Some((Token::Comma, _))) = self.lexer.peek_opt() {
                self.lexer.consume();
                let currency = self.lexer.take(Token::Currency)?;
                set.insert(currency.to_string());
            }
        }
        Ok(set)
    }

    fn parse_meta(&mut self) -> Result<Meta, Error> {
        let mut meta = Meta::new();
        while let Ok(Some((Token::MetaLabel, label))) = self.lexer.peek_opt() {
            let start = self.lexer.location();
            self.lexer.consume();
            let key = label.trim_end_matches(':').to_string();
            let val = self.parse_string()?;
            meta.insert(key, (val, self.src_from(start)));
        }
        Ok(meta)
    }

    fn parse_string(&mut self) -> Result<String, Error> {
        let quoted = self.lexer.take(Token::String)?;
        Ok(Self::unescape(Self::remove_quotes(quoted)))
    }

    #[inline]
    fn remove_quotes(input: &str) -> &str {
        let mut chars = input.chars();
        chars.next();
        chars.next_back();
        chars.as_str()
    }

    fn unescape(input: &str) -> String {
        if !input.contains('\\') {
            return input.to_string();
        }
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                result.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(escaped) => result.push(escaped),
                None => {}
            }
        }
        result
    }

    fn parse_date(&mut self) -> Result<Date, Error> {
        let start = self.lexer.location();
        let date_str = self.lexer.take(Token::Date)?;
        let date = date_str.parse::<Date>().map_err(|_| Error {
            kind: ErrorKind::Lex {
                reason: format!("Invalid date: {}.", date_str),
            },
            src: self.src_from(start),
        })?;
        Ok(date)
    }

    fn parse_amount(&mut self) -> Result<Amount, Error> {
        let start = self.lexer.location();
        let num_str = self.lexer.take(Token::Number)?;
        let number = num_str.parse::<Decimal>().map_err(|e| Error {
            kind: ErrorKind::Lex {
                reason: format!("Invalid number {}: {}.", num_str, e),
            },
            src: self.src_from(start),
        })?;
        let currency = self.lexer.take(Token::Currency)?;
        Ok(Amount {
            number,
            currency: currency.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Directive>, Error> {
        Parser::parse(text, Arc::new("test".to_string()))
    }

    #[test]
    fn parses_option() {
        let directives = parse("option \"title\" \"Example\"\n").unwrap();
        match &directives[0] {
            Directive::Option(option) => {
                assert_eq!(option.key, "title");
                assert_eq!(option.value, "Example");
            }
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn parses_open_with_currencies_and_alias() {
        let text = "2023-01-01 open Assets:Bank USD, EUR\n  alias: \"bank\"\n";
        let directives = parse(text).unwrap();
        match &directives[0] {
            Directive::Open(open) => {
                assert_eq!(open.account.as_str(), "Assets:Bank");
                assert!(open.currencies.contains("USD"));
                assert!(open.currencies.contains("EUR"));
                assert_eq!(open.meta["alias"].0, "bank");
            }
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn parses_commodity_with_attributes() {
        let text = "2023-01-01 commodity USD\n  precision: \"2\"\n  prefix: \"$\"\n";
        let directives = parse(text).unwrap();
        match &directives[0] {
            Directive::Commodity(commodity) => {
                assert_eq!(commodity.name, "USD");
                assert_eq!(commodity.meta["precision"].0, "2");
                assert_eq!(commodity.meta["prefix"].0, "$");
            }
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn parses_price() {
        let directives = parse("2023-01-01 price USD 7.1 CNY\n").unwrap();
        match &directives[0] {
            Directive::Price(price) => {
                assert_eq!(price.commodity, "USD");
                assert_eq!(price.amount.number, "7.1".parse().unwrap());
                assert_eq!(price.amount.currency, "CNY");
            }
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn include_keeps_raw_path() {
        let directives = parse("include \"accounts/bank.saldo\"\n").unwrap();
        match &directives[0] {
            Directive::Include(include) => assert_eq!(include.path, "accounts/bank.saldo"),
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn string_escapes_are_decoded() {
        let directives = parse("2023-01-01 event \"note\" \"say \\\"hi\\\"\"\n").unwrap();
        match &directives[0] {
            Directive::Event(event) => assert_eq!(event.value, "say \"hi\""),
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn invalid_calendar_date_fails() {
        let err = parse("2023-02-31 open Assets:Bank\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Lex { .. }));
    }

    #[test]
    fn unknown_directive_fails() {
        let err = parse("2023-01-01 USD 10\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    }

    #[test]
    fn directive_order_is_preserved() {
        let text = "option \"title\" \"t\"\n2023-01-01 open Assets:Bank\n2023-02-01 close Assets:Bank\n";
        let directives = parse(text).unwrap();
        assert_eq!(directives.len(), 3);
        assert!(matches!(directives[0], Directive::Option(_)));
        assert!(matches!(directives[1], Directive::Open(_)));
        assert!(matches!(directives[2], Directive::Close(_)));
        let lines: Vec<usize> = directives.iter().map(|d| d.src().start.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}

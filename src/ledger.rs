use crate::checker;
use crate::parse::Resolver;
pub use chrono::NaiveDate as Date;
use getset::{CopyGetters, Getters};
pub use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::convert::From;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Representing a location, line number and column number, in a source file.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn advance(&self, width: usize) -> Self {
        Location {
            col: self.col + width,
            line: self.line,
        }
    }
}

impl From<(usize, usize)> for Location {
    fn from(tuple: (usize, usize)) -> Self {
        Location {
            line: tuple.0,
            col: tuple.1,
        }
    }
}

/// A string wrapped in [`Arc`](std::sync::Arc)
/// representing the source file path.
pub type SrcFile = Arc<String>;

/// Represents a range in a source file. This struct is used to track the origins
/// of any information in the generated [`Ledger`], as well as for locating errors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub file: SrcFile,
    pub start: Location,
    pub end: Location,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.col)
    }
}

/// Kinds of errors that `saldo` encountered while building a [`Ledger`] from
/// directive files. Each variant carries the offending names so callers can
/// render an actionable message.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The content of an input file cannot be read.
    Io { path: String, reason: String },
    /// Malformed literal in the source file, e.g. an unterminated string.
    Lex { reason: String },
    /// A directive does not match any recognized shape.
    Syntax { expected: String, found: String },
    /// An `include` chain revisits a file that is still being resolved.
    CyclicInclude { cycle: Vec<String> },
    /// An account is opened twice.
    DuplicateAccount { name: String },
    /// An alias is claimed by two different accounts.
    DuplicateAlias { alias: String },
    /// A commodity symbol is defined twice.
    DuplicateCommodity { name: String },
    /// A directive refers to an account that was never opened.
    UnknownAccount { name: String },
    /// An account is closed twice.
    AlreadyClosed { name: String },
    /// A directive refers to an account outside its open/close range.
    AccountNotActive { name: String },
    /// A builtin option or commodity attribute holds an unparsable value.
    InvalidOptionValue { key: String, value: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Io { path, reason } => write!(f, "Couldn't read {}: {}.", path, reason),
            ErrorKind::Lex { reason } => write!(f, "{}", reason),
            ErrorKind::Syntax { expected, found } => {
                write!(f, "Expected {}, found {}.", expected, found)
            }
            ErrorKind::CyclicInclude { cycle } => {
                write!(f, "Cyclic include: {}.", cycle.join(" -> "))
            }
            ErrorKind::DuplicateAccount { name } => {
                write!(f, "Account {} has already been opened.", name)
            }
            ErrorKind::DuplicateAlias { alias } => {
                write!(f, "Alias {} is already taken by another account.", alias)
            }
            ErrorKind::DuplicateCommodity { name } => {
                write!(f, "Commodity {} has already been defined.", name)
            }
            ErrorKind::UnknownAccount { name } => {
                write!(f, "Reference to an unknown account {}.", name)
            }
            ErrorKind::AlreadyClosed { name } => {
                write!(f, "Account {} has already been closed.", name)
            }
            ErrorKind::AccountNotActive { name } => {
                write!(f, "Account {} is not active at this date.", name)
            }
            ErrorKind::InvalidOptionValue { key, value } => {
                write!(f, "Invalid value {:?} for {}.", value, key)
            }
        }
    }
}

/// Contains the full information of an error: what went wrong and where.
///
/// The first error encountered aborts the whole construction; [`Ledger::load`]
/// never returns a partially built ledger.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub src: Source,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  {}:{}:{}",
            self.kind, self.src.file, self.src.start.line, self.src.start.col
        )
    }
}

impl std::error::Error for Error {}

pub type Currency = String;

/// A [`Decimal`] number plus the currency.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount {
    pub number: Decimal,
    pub currency: Currency,
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

/// A string wrapped in [`Arc`](std::sync::Arc)
/// representing the account name.
pub type Account = Arc<String>;

/// The top-level namespace of an account, derived from the first segment of
/// its name. Any segment outside the five standard ones is kept as
/// [`AccountType::Custom`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccountType {
    Assets,
    Liabilities,
    Equity,
    Income,
    Expenses,
    Custom(String),
}

impl AccountType {
    pub fn from_name(name: &str) -> Self {
        let root = name.split(':').next().unwrap_or(name);
        match root {
            "Assets" => AccountType::Assets,
            "Liabilities" => AccountType::Liabilities,
            "Equity" => AccountType::Equity,
            "Income" => AccountType::Income,
            "Expenses" => AccountType::Expenses,
            _ => AccountType::Custom(root.to_string()),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Assets => write!(f, "Assets"),
            AccountType::Liabilities => write!(f, "Liabilities"),
            AccountType::Equity => write!(f, "Equity"),
            AccountType::Income => write!(f, "Income"),
            AccountType::Expenses => write!(f, "Expenses"),
            AccountType::Custom(root) => write!(f, "{}", root),
        }
    }
}

/// The lifecycle state of an account. A closed account stays in the registry
/// for historical lookup but rejects further activity.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Open,
    Closed,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Open => write!(f, "Open"),
            AccountStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// The policy governing how fractional amounts in a commodity are normalized
/// to its declared precision.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    RoundUp,
    RoundDown,
    RoundHalfUp,
    RoundHalfEven,
}

impl Rounding {
    pub fn strategy(&self) -> RoundingStrategy {
        match self {
            Rounding::RoundUp => RoundingStrategy::AwayFromZero,
            Rounding::RoundDown => RoundingStrategy::ToZero,
            Rounding::RoundHalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::RoundHalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl Default for Rounding {
    fn default() -> Self {
        Rounding::RoundDown
    }
}

impl FromStr for Rounding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RoundUp" => Ok(Rounding::RoundUp),
            "RoundDown" => Ok(Rounding::RoundDown),
            "RoundHalfUp" => Ok(Rounding::RoundHalfUp),
            "RoundHalfEven" => Ok(Rounding::RoundHalfEven),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rounding::RoundUp => write!(f, "RoundUp"),
            Rounding::RoundDown => write!(f, "RoundDown"),
            Rounding::RoundHalfUp => write!(f, "RoundHalfUp"),
            Rounding::RoundHalfEven => write!(f, "RoundHalfEven"),
        }
    }
}

/// Represents a `note` directive
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountNote {
    pub date: Date,
    pub val: String,
    pub src: Source,
}

/// Represents a `document` directive
pub type AccountDoc = AccountNote;

/// Represents the meta data attached to a directive.
pub type Meta = HashMap<String, (String, Source)>;

/// Represents an `event` directive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventInfo {
    pub date: Date,
    pub desc: String,
    pub src: Source,
}

impl From<(Date, String, Source)> for EventInfo {
    fn from(tuple: (Date, String, Source)) -> Self {
        EventInfo {
            date: tuple.0,
            desc: tuple.1,
            src: tuple.2,
        }
    }
}

/// Represents a `price` directive: the dated rate of one commodity expressed
/// in another. No conversion arithmetic is performed on it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceInfo {
    pub date: Date,
    pub commodity: Currency,
    pub amount: Amount,
    pub src: Source,
}

/// Contains the registry state of a single account: its namespace, lifecycle,
/// optional alias, and the notes and documents attached to it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct AccountInfo {
    /// Returns the full account name, e.g. `Assets:Bank`.
    #[getset(get = "pub")]
    pub(crate) name: Account,

    /// Returns the top-level namespace of the account.
    #[getset(get = "pub")]
    pub(crate) account_type: AccountType,

    /// Returns whether the account is still open.
    #[getset(get_copy = "pub")]
    pub(crate) status: AccountStatus,

    /// Returns the alias declared on the `open` directive, if any.
    #[getset(get = "pub")]
    pub(crate) alias: Option<String>,

    /// Returns the account open date and the source of the `open` directive.
    #[getset(get = "pub")]
    pub(crate) open: (Date, Source),

    /// Returns the account close date and the source of the `close` directive.
    #[getset(get = "pub")]
    pub(crate) close: Option<(Date, Source)>,

    /// Returns the allowed currencies of this account. If there are no limitations,
    /// an empty set is returned.
    #[getset(get = "pub")]
    pub(crate) currencies: HashSet<Currency>,

    /// Returns the account notes in `note` directives.
    #[getset(get = "pub")]
    pub(crate) notes: Vec<AccountNote>,

    /// Returns the account documents in `document` directives.
    #[getset(get = "pub")]
    pub(crate) docs: Vec<AccountDoc>,

    /// Returns the meta data associated with the `open` directive.
    #[getset(get = "pub")]
    pub(crate) meta: Meta,
}

/// Contains the registry state of a single commodity: its display attributes
/// and rounding policy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Commodity {
    /// Returns the commodity symbol, e.g. `USD`.
    #[getset(get = "pub")]
    pub(crate) name: Currency,

    /// Returns the number of fractional digits used for display and rounding.
    #[getset(get_copy = "pub")]
    pub(crate) precision: u32,

    /// Returns the display prefix, e.g. `$`.
    #[getset(get = "pub")]
    pub(crate) prefix: Option<String>,

    /// Returns the display suffix.
    #[getset(get = "pub")]
    pub(crate) suffix: Option<String>,

    /// Returns the rounding policy of this commodity.
    #[getset(get_copy = "pub")]
    pub(crate) rounding: Rounding,

    /// Returns the meta data associated with the `commodity` directive.
    #[getset(get = "pub")]
    pub(crate) meta: Meta,

    /// Returns the source of the `commodity` directive, or of the first use
    /// for a synthesized record.
    #[getset(get = "pub")]
    pub(crate) src: Source,
}

impl Commodity {
    /// Normalizes `number` to this commodity's precision, following its
    /// rounding policy.
    pub fn round(&self, number: Decimal) -> Decimal {
        number.round_dp_with_strategy(self.precision, self.rounding.strategy())
    }
}

/// Represents a fully resolved and validated ledger: the options, accounts,
/// and commodities accumulated over the entry file and all its includes.
///
/// A `Ledger` is immutable once constructed; changing the underlying files
/// requires building a new one with [`Ledger::load`]. Closing and later
/// reopening the same account name is not supported.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Ledger {
    /// Returns the options as a hash map. Later directives for the same key
    /// overwrite earlier ones.
    #[getset(get = "pub")]
    pub(crate) options: HashMap<String, (String, Source)>,

    /// Returns the information of accounts.
    #[getset(get = "pub")]
    pub(crate) accounts: HashMap<Account, AccountInfo>,

    /// Returns all the commodities, declared or synthesized.
    #[getset(get = "pub")]
    pub(crate) commodities: HashMap<Currency, Commodity>,

    /// Returns the alias index, mapping each alias to its account name.
    #[getset(get = "pub")]
    pub(crate) aliases: HashMap<String, Account>,

    /// Returns the events.
    #[getset(get = "pub")]
    pub(crate) events: HashMap<String, Vec<EventInfo>>,

    /// Returns the recorded prices, in directive order.
    #[getset(get = "pub")]
    pub(crate) prices: Vec<PriceInfo>,

    /// Returns the resolved files, in depth-first inclusion order.
    #[getset(get = "pub")]
    pub(crate) files: Vec<PathBuf>,
}

impl Ledger {
    /// Reads `entry` relative to the ledger root directory `root`, follows
    /// its `include` directives, and folds all directives into a `Ledger`.
    ///
    /// Construction either fully succeeds or fails with the first [`Error`]
    /// encountered; no partially built ledger is ever returned.
    pub fn load(root: impl AsRef<Path>, entry: &str) -> Result<Ledger, Error> {
        let resolution = Resolver::resolve(root.as_ref(), entry)?;
        checker::build(resolution.directives, resolution.files)
    }

    /// Looks up an account by its alias.
    pub fn account_by_alias(&self, alias: &str) -> Option<&AccountInfo> {
        self.aliases
            .get(alias)
            .and_then(|name| self.accounts.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_type_from_name() {
        assert_eq!(AccountType::from_name("Assets:Bank"), AccountType::Assets);
        assert_eq!(AccountType::from_name("Income:Salary"), AccountType::Income);
        assert_eq!(
            AccountType::from_name("Virtual:Budget"),
            AccountType::Custom("Virtual".to_string())
        );
    }

    #[test]
    fn rounding_normalizes_amounts() {
        let commodity = Commodity {
            name: "USD".to_string(),
            precision: 2,
            prefix: None,
            suffix: None,
            rounding: Rounding::RoundHalfEven,
            meta: Meta::new(),
            src: Source {
                file: Arc::new(String::new()),
                start: (1, 1).into(),
                end: (1, 1).into(),
            },
        };
        assert_eq!(
            commodity.round("1.005".parse().unwrap()),
            "1.00".parse().unwrap()
        );
        assert_eq!(
            commodity.round("1.015".parse().unwrap()),
            "1.02".parse().unwrap()
        );
    }

    #[test]
    fn rounding_from_str() {
        assert_eq!("RoundHalfUp".parse::<Rounding>(), Ok(Rounding::RoundHalfUp));
        assert!("RoundSideways".parse::<Rounding>().is_err());
    }
}

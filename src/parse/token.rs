use logos::Logos;

#[derive(Debug, PartialEq, Logos, Clone, Copy)]
pub enum Token {
    #[regex(r"[ \f\r\t\v]+")]
    WhiteSpace,

    #[token("include")]
    Include,

    #[token("option")]
    Option,

    #[token("commodity")]
    Commodity,

    #[token("open")]
    Open,

    #[token("close")]
    Close,

    #[token("note")]
    Note,

    #[token("document")]
    Document,

    #[token("event")]
    Event,

    #[token("price")]
    Price,

    #[regex(r"[;#][^\n]*")]
    Comment,

    #[token(",")]
    Comma,

    #[token("\n")]
    NewLine,

    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    String,

    #[regex(r"\d\d\d\d-\d\d-\d\d")]
    Date,

    #[regex(r#"[^a-z,#\^":;{}\s\d\-\+\.][^,#\^":;{}\s]*(:[^,#\^":;{}\s]+)+"#)]
    Account,

    #[regex(r#"[^A-Z,#\^":;{}\s\d\-\+\.][^,#\^":;{}\s]*:"#)]
    MetaLabel,

    #[regex(r#"[^a-z,#\^":;{}\s\d\-\+\.][^,#\^":;{}\s]*"#)]
    Currency,

    #[regex(r"[\-\+]?\d+(\.\d*)?")]
    #[regex(r"[\-\+]?\.\d+")]
    Number,

    #[error]
    Error,
}

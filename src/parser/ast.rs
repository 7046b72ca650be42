use std::fmt;

/// `name(arg, ...)`
#[derive(Clone, Debug, PartialEq)]
pub struct QueryCall {
    pub name: String,
    pub args: Vec<QueryArg>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryArg {
    Str(String),
    Int(i64),
    /// `/source/flags`
    Pattern { source: String, flags: String },
    Call(QueryCall),
}

impl QueryCall {
    pub fn new(name: impl Into<String>, args: Vec<QueryArg>) -> Self {
        QueryCall {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for QueryCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.name,
            self.args
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

impl fmt::Display for QueryArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryArg::Str(s) => write!(f, "{:?}", s),
            QueryArg::Int(i) => write!(f, "{}", i),
            QueryArg::Pattern { source, flags } => write!(f, "/{}/{}", source, flags),
            QueryArg::Call(c) => write!(f, "{}", c),
        }
    }
}

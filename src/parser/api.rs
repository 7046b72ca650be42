use pest::error::{Error, ErrorVariant};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::*;

#[derive(Parser)]
#[grammar = "parser/filter_query.pest"] // relative to src
pub struct FilterQueryParser;

impl FilterQueryParser {
    pub fn parse_to_ast_from_str(query: &str) -> Result<QueryCall, Error<Rule>> {
        let mut pairs = FilterQueryParser::parse(Rule::query, query)?;
        let query_pair = match pairs.next() {
            Some(p) => p,
            None => return Err(custom_error("empty query", query)),
        };
        match query_pair.into_inner().next() {
            Some(call) if call.as_rule() == Rule::call => build_ast_from_call(call),
            _ => Err(custom_error("expected a call", query)),
        }
    }
}

fn custom_error(message: &str, query: &str) -> Error<Rule> {
    Error::new_from_pos(
        ErrorVariant::CustomError {
            message: message.to_string(),
        },
        pest::Position::from_start(query),
    )
}

fn get_unexpected_error(pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}]", pair.as_rule());
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn build_ast_from_call(pair: Pair<Rule>) -> Result<QueryCall, Error<Rule>> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let name = match inner.next() {
        Some(p) if p.as_rule() == Rule::identifier => p.as_str().to_string(),
        Some(p) => return Err(get_unexpected_error(&p)),
        None => {
            return Err(Error::new_from_span(
                ErrorVariant::CustomError {
                    message: "call without a name".to_string(),
                },
                span,
            ))
        }
    };
    let mut args = vec![];
    for arg in inner {
        args.push(build_ast_from_argument(arg)?);
    }
    Ok(QueryCall { name, args })
}

fn build_ast_from_argument(pair: Pair<Rule>) -> Result<QueryArg, Error<Rule>> {
    match pair.as_rule() {
        Rule::call => Ok(QueryArg::Call(build_ast_from_call(pair)?)),
        Rule::string => {
            let raw = pair
                .clone()
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or("");
            Ok(QueryArg::Str(unescape(raw)))
        }
        Rule::integer => pair.as_str().parse::<i64>().map(QueryArg::Int).map_err(|e| {
            Error::new_from_span(
                ErrorVariant::CustomError {
                    message: e.to_string(),
                },
                pair.as_span(),
            )
        }),
        Rule::pattern => {
            let mut inner = pair.clone().into_inner();
            let source = inner.next().map(|p| p.as_str()).unwrap_or("");
            let flags = inner.next().map(|p| p.as_str()).unwrap_or("");
            Ok(QueryArg::Pattern {
                source: source.replace("\\/", "/"),
                flags: flags.to_string(),
            })
        }
        _ => Err(get_unexpected_error(&pair)),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

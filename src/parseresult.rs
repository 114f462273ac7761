use crate::error::{Error, SourceInfo};
use nom::error::{VerboseError, VerboseErrorKind};
use nom::IResult;

/// Parser result over template source, with verbose error.
pub type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Convert a nom error into the crate error, locating it relative to
/// `info` (the start of the source fragment being parsed).  The byte
/// offset of the failure is recovered from the length of the remaining
/// input, and the innermost labelled context wins.
pub fn to_parse_error(source: &str, error: &VerboseError<&str>, info: &SourceInfo) -> Error {
    let (offset, message) = describe(source, error);
    Error::Parse {
        message,
        info: info.advanced(&source[..offset]),
    }
}

fn describe(source: &str, error: &VerboseError<&str>) -> (usize, String) {
    for (rest, kind) in &error.errors {
        if let Some(message) = get_message(kind) {
            return (source.len() - rest.len(), message);
        }
    }
    let offset = error
        .errors
        .first()
        .map_or(0, |(rest, _)| source.len() - rest.len());
    (offset, "syntax error".to_string())
}

fn get_message(kind: &VerboseErrorKind) -> Option<String> {
    match kind {
        VerboseErrorKind::Context(message) => Some((*message).to_string()),
        VerboseErrorKind::Char(ch) => Some(format!("expected {:?}", ch)),
        VerboseErrorKind::Nom(_) => None,
    }
}

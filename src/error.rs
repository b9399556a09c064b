use std::error::Error as StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    IO(String),
    #[error("{0}")]
    Deserialization(String),
    #[error("Template render: {0}")]
    Template(String),
    #[error("Unsupported file extension: {0}")]
    UnsupportedExt(String),
    #[error("{0}")]
    Msg(String),
}

impl std::convert::From<tera::Error> for Error {
    fn from(err: tera::Error) -> Self {
        if let Some(source) = err.source() {
            Error::Template(format!("{}\n{}", err, source))
        } else {
            Error::Template(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

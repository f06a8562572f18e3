use std::error::Error;
use std::fmt::Display;

use crate::lexer::FilePosition;

#[derive(Debug, Clone)]
pub struct TypeError {
    pub message: String,
    pub position: Option<FilePosition>,
}

impl TypeError {
    pub fn at(message: impl Into<String>, position: FilePosition) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.position {
            Some(position) => write!(f, "Type error at {position}: {}", self.message),
            None => write!(f, "Type error: {}", self.message),
        }
    }
}

impl Error for TypeError {}

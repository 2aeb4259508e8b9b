use std::io;
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Input ran out while a decoder still expected more bytes, e.g. mid
    /// descriptor-word or mid match payload.
    UnexpectedEof,
    /// A decoder read something its bitstream grammar has no case for:
    /// a back-reference pointing before the start of the output, an
    /// unrecognized opcode, or similar.
    Format(String),
    /// A caller-supplied configuration value is unusable, e.g. a module
    /// size of zero, or an odd-length input to a format that only
    /// understands 16-bit words.
    Config(String),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::Format(ref msg) => write!(f, "malformed input: {}", msg),
            Error::Config(ref msg) => write!(f, "invalid configuration: {}", msg),
            Error::Io(ref err) => err.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

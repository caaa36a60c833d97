//! Types for error handling go here.
use crate::mapping::IndexType;
use std::io::Error as IOError;
use std::str::Utf8Error;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum CiftiError {
        /// Malformed or unsupported CIFTI XML document
        Parse(msg: String) {
            display("Cifti XML error: {}", msg)
        }
        /// Error from the XML tokenizer
        Xml(err: quick_xml::Error) {
            from()
            source(err)
            display("XML error: {}", err)
        }
        /// XML content was not valid UTF-8
        Utf8(err: Utf8Error) {
            from()
            source(err)
            display("invalid UTF-8 in XML: {}", err)
        }
        /// An operation would break an invariant of a mapping
        Invalid(msg: String) {
            display("{}", msg)
        }
        /// A typed mapping was requested from a dimension of another type
        WrongMappingType(expected: IndexType, found: IndexType) {
            display("expected {:?} mapping, found {:?}", expected, found)
        }
        /// The dimension has no mapping, or does not exist
        NoMapping(dim: usize) {
            display("dimension {} was not given a mapping", dim)
        }
        /// Plumb decomposition requested for an oblique volume space
        NotPlumb {
            display("orientation and spacing asked for on non-plumb volume space")
        }
        /// A reduction could not be computed
        Reduction(msg: String) {
            display("{}", msg)
        }
        /// Preconditions of an algorithm were not met
        Algorithm(msg: String) {
            display("{}", msg)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("{}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, CiftiError>;

/// Shorthand for an invariant violation with the given message.
pub(crate) fn invalid<T, S: Into<String>>(msg: S) -> Result<T> {
    Err(CiftiError::Invalid(msg.into()))
}

/// Shorthand for a malformed document with the given message.
pub(crate) fn parse_err<T, S: Into<String>>(msg: S) -> Result<T> {
    Err(CiftiError::Parse(msg.into()))
}

//! Setup-time error types
//!
//! Setup errors are recoverable: a caller can catch them and fall back to
//! not observing the operation. Call-time contract violations are not errors
//! — see `marshal`.

use tripwire_object::ObjectId;

/// Why an interception request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The class does not expose the requested selector
    #[error("class `{class}` does not respond to `{selector}`")]
    UnknownOperation {
        /// Receiver's class name
        class: String,
        /// Requested selector name
        selector: String,
    },

    /// The method's signature contains an encoding the marshaller cannot
    /// safely represent
    #[error("cannot intercept `{selector}` on `{class}`: unsupported {encoding} encoding")]
    UnsupportedEncoding {
        /// Receiver's class name
        class: String,
        /// Requested selector name
        selector: String,
        /// Shape name of the offending encoding
        encoding: &'static str,
    },

    /// The target object's lifetime has already ended
    #[error("object {0:?} is no longer alive")]
    DeadObject(ObjectId),
}

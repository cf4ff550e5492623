// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Standard error enum for driver operations.

use core::fmt;

/// Standard errors.
///
/// The register-level operations of the drivers do not fail; they fall back
/// to defined behaviour instead. This type is used by the few helpers that do
/// validate their input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// An invalid parameter was passed
    INVAL = 5,
    /// Parameter passed was too large
    SIZE = 6,
}

impl From<ErrorCode> for usize {
    fn from(err: ErrorCode) -> usize {
        err as usize
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let description = match self {
            ErrorCode::INVAL => "invalid parameter",
            ErrorCode::SIZE => "parameter too large",
        };
        f.write_str(description)
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;

    #[test]
    fn codes_match_tock_numbering() {
        assert_eq!(usize::from(ErrorCode::INVAL), 5);
        assert_eq!(usize::from(ErrorCode::SIZE), 6);
    }

    #[test]
    fn display() {
        assert_eq!(ErrorCode::INVAL.to_string(), "invalid parameter");
    }
}

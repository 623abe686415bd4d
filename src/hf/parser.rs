//! AT result-code tokenizer
//!
//! Splits one raw, upper-cased result-code line into a closed classification
//! the engine can match on exhaustively. No state is touched here; malformed
//! lines come out as [`ResultCode::Unknown`] and are dropped by the caller.

/// Command name of an unsolicited `+<NAME>:<args>` event line
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum EventKind {
    /// Indicator support or value response
    Cind,
    /// AG feature bitmask
    Brsf,
    /// Single indicator update
    Ciev,
    /// Current-call list entry
    Clcc,
    /// Call waiting notification
    Ccwa,
    /// Speaker gain
    Vgs,
    /// Voice recognition state
    Bvra,
    /// Recognized shape, unrecognized name
    Other,
}

impl EventKind {
    /// Match an extracted command name
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "CIND" => Self::Cind,
            "BRSF" => Self::Brsf,
            "CIEV" => Self::Ciev,
            "CLCC" => Self::Clcc,
            "CCWA" => Self::Ccwa,
            "VGS" => Self::Vgs,
            "BVRA" => Self::Bvra,
            _ => Self::Other,
        }
    }
}

/// Classification of one inbound result-code line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode<'a> {
    /// Extended error report, fails the pending client request
    ExtendedError,
    /// `+<NAME>:<args>` event line
    Event {
        /// Dispatched command name
        kind: EventKind,
        /// Argument text after the last `:`, leading whitespace stripped
        args: &'a str,
    },
    /// Bare `RING`
    Ring,
    /// Bare `OK` acknowledgement
    Ok,
    /// Bare `ERROR` rejection
    Error,
    /// Unrecognized line
    Unknown,
}

/// Classify one raw result-code line
///
/// Order matters: an extended-error report wins over event-line shape, and
/// only lines without any `:` are considered bare status codes.
#[must_use]
pub fn classify(line: &str) -> ResultCode<'_> {
    if line.contains("CMEE") {
        return ResultCode::ExtendedError;
    }

    if let Some(colon) = line.find(':') {
        let head = &line[..colon];
        let name = match head.find('+') {
            Some(plus) => &head[plus + 1..],
            None => head,
        };
        // args sit after the last colon, some peers echo nested ones
        let args = match line.rfind(':') {
            Some(last) => &line[last + 1..],
            None => "",
        };
        return ResultCode::Event {
            kind: EventKind::from_name(name.trim()),
            args: args.trim_start(),
        };
    }

    let bare = line.trim();
    if bare == "RING" {
        ResultCode::Ring
    } else if bare.starts_with("OK") {
        ResultCode::Ok
    } else if bare.starts_with("ERROR") {
        ResultCode::Error
    } else {
        ResultCode::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_status_lines() {
        assert_eq!(classify("RING"), ResultCode::Ring);
        assert_eq!(classify("  RING  "), ResultCode::Ring);
        assert_eq!(classify("OK"), ResultCode::Ok);
        assert_eq!(classify("ERROR"), ResultCode::Error);
        assert_eq!(classify("NO CARRIER"), ResultCode::Unknown);
    }

    #[test]
    fn test_extended_error_wins_over_event_shape() {
        assert_eq!(classify("+CMEE: 1"), ResultCode::ExtendedError);
        assert_eq!(classify("CMEE"), ResultCode::ExtendedError);
    }

    #[test]
    fn test_event_name_and_args_extraction() {
        assert_eq!(
            classify("+CIEV: 2,1"),
            ResultCode::Event { kind: EventKind::Ciev, args: "2,1" }
        );
        assert_eq!(
            classify("+BRSF: 871"),
            ResultCode::Event { kind: EventKind::Brsf, args: "871" }
        );
        assert_eq!(
            classify("VGS: 7"),
            ResultCode::Event { kind: EventKind::Vgs, args: "7" }
        );
        assert_eq!(
            classify("+BSIR: 1"),
            ResultCode::Event { kind: EventKind::Other, args: "1" }
        );
    }

    #[test]
    fn test_clcc_record_line() {
        let code = classify("+CLCC: 1,0,0,0,0,\"+15551234567\",145");
        assert_eq!(
            code,
            ResultCode::Event {
                kind: EventKind::Clcc,
                args: "1,0,0,0,0,\"+15551234567\",145"
            }
        );
    }

    #[test]
    fn test_cind_support_response_keeps_full_args() {
        let code = classify("+CIND: (\"SERVICE\",(0,1)),(\"CALL\",(0,1))");
        match code {
            ResultCode::Event { kind: EventKind::Cind, args } => {
                assert!(args.starts_with("(\"SERVICE\""));
            }
            other => panic!("unexpected classification {other:?}"),
        }
    }
}

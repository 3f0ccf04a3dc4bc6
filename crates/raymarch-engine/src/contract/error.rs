use thiserror::Error;

use super::{ParamKind, SlotSet};

/// A kernel (or a caller) disagrees with the parameter contract.
///
/// These are configuration errors: they do not go away by retrying next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("kernel source failed to parse:\n{0}")]
    Parse(String),

    #[error("binding {group}:{binding} (`{name}`) is not part of the kernel contract")]
    UnexpectedBinding {
        group: u32,
        binding: u32,
        name: String,
    },

    #[error("binding {binding} is named `{found}`, the contract names it `{expected}`")]
    NameMismatch {
        binding: u32,
        expected: &'static str,
        found: String,
    },

    #[error("slot `{slot}` must be declared as {expected}")]
    WrongResource {
        slot: &'static str,
        expected: &'static str,
    },

    #[error("`{record}` has no member `{member}`")]
    MissingMember {
        record: &'static str,
        member: &'static str,
    },

    #[error("`{record}.{member}` is at offset {found}, the host writes it at {expected}")]
    MemberOffset {
        record: &'static str,
        member: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("`{record}` is {found} bytes on the kernel side, {expected} on the host")]
    RecordSize {
        record: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("parameter `{slot}` is {expected:?}, got {found:?}")]
    ParamKind {
        slot: &'static str,
        expected: ParamKind,
        found: ParamKind,
    },

    #[error("kernel declares {declared:?} but this configuration binds {required:?}")]
    SlotSetMismatch {
        declared: SlotSet,
        required: SlotSet,
    },
}

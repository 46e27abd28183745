//! Proptest generators for property-based testing.

use proptest::prelude::*;

use safehall_policy::{ChannelType, MessageKind, PermissionLevel, Principal, Role};
use safehall_safety::{Lexicon, TermCategory};

use crate::fixtures::ORG;

/// Generate a Role.
pub fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Student), Just(Role::Teacher), Just(Role::Parent), Just(Role::Admin)]
}

/// Generate a ChannelType.
pub fn channel_type() -> impl Strategy<Value = ChannelType> {
    prop_oneof![
        Just(ChannelType::Direct),
        Just(ChannelType::Announcement),
        Just(ChannelType::Emergency),
    ]
}

/// Generate a PermissionLevel.
pub fn permission_level() -> impl Strategy<Value = PermissionLevel> {
    prop_oneof![
        Just(PermissionLevel::ReadOnly),
        Just(PermissionLevel::ReadWrite),
        Just(PermissionLevel::Moderator),
    ]
}

/// Generate a MessageKind.
pub fn message_kind() -> impl Strategy<Value = MessageKind> {
    prop_oneof![
        Just(MessageKind::Text),
        Just(MessageKind::Announcement),
        Just(MessageKind::Emergency),
    ]
}

/// Generate a principal in the fixture org.
pub fn principal() -> impl Strategy<Value = Principal> {
    ("[a-z]{1,8}", role()).prop_map(|(id, role)| Principal::new(id.clone(), role, ORG, id))
}

/// Generate lowercase text built from words absent from the standard
/// lexicon, so it never matches any term.
pub fn benign_text() -> impl Strategy<Value = String> {
    const WORDS: &[&str] = &[
        "the", "bus", "leaves", "at", "noon", "bring", "your", "lunch", "and", "a", "jacket", "tomorrow", "blue",
        "notebook", "library", "music", "recess",
    ];
    prop::collection::vec(prop::sample::select(WORDS), 0..12).prop_map(|words| words.join(" "))
}

/// Generate a term from the standard lexicon's critical self-harm category.
pub fn self_harm_term() -> impl Strategy<Value = String> {
    let terms: Vec<String> = Lexicon::standard()
        .negative
        .into_iter()
        .filter(|t| t.category == TermCategory::SelfHarm)
        .map(|t| t.term)
        .collect();
    prop::sample::select(terms)
}

/// Generate any negative term from the standard lexicon.
pub fn negative_term() -> impl Strategy<Value = String> {
    let terms: Vec<String> = Lexicon::standard().negative.into_iter().map(|t| t.term).collect();
    prop::sample::select(terms)
}

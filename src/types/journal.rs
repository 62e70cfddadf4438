//! Journal command types
//!
//! A journal is a replayable list of ledger commands. Commands name users
//! and groups by their unique names; ids are resolved against the store
//! when the command is applied.

use super::expense::SplitPolicy;
use super::money::Money;
use rust_decimal::Decimal;

/// One participant of a journaled expense: username and optional value
pub type JournalShare = (String, Option<Decimal>);

/// A single journal command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalCommand {
    RegisterUser {
        username: String,
        email: String,
        full_name: String,
    },
    AddFriend {
        user: String,
        friend: String,
    },
    RemoveFriend {
        user: String,
        friend: String,
    },
    CreateGroup {
        name: String,
        creator: String,
        members: Vec<String>,
        description: String,
    },
    AddMember {
        group: String,
        user: String,
    },
    Expense {
        group: String,
        payer: String,
        amount: Money,
        policy: SplitPolicy,
        participants: Vec<JournalShare>,
        description: String,
    },
    Settle {
        group: String,
        debtor: String,
        creditor: String,
        amount: Money,
        note: Option<String>,
    },
}

impl JournalCommand {
    /// The group a command is scoped to
    ///
    /// Registry commands (users, friendships, group creation) return `None`:
    /// they must be applied in file order relative to every other command.
    pub fn group(&self) -> Option<&str> {
        match self {
            JournalCommand::AddMember { group, .. }
            | JournalCommand::Expense { group, .. }
            | JournalCommand::Settle { group, .. } => Some(group),
            JournalCommand::RegisterUser { .. }
            | JournalCommand::AddFriend { .. }
            | JournalCommand::RemoveFriend { .. }
            | JournalCommand::CreateGroup { .. } => None,
        }
    }

    pub fn is_barrier(&self) -> bool {
        self.group().is_none()
    }

    /// Journal `type` keyword of the command
    pub fn kind(&self) -> &'static str {
        match self {
            JournalCommand::RegisterUser { .. } => "user",
            JournalCommand::AddFriend { .. } => "friend",
            JournalCommand::RemoveFriend { .. } => "unfriend",
            JournalCommand::CreateGroup { .. } => "group",
            JournalCommand::AddMember { .. } => "member",
            JournalCommand::Expense { .. } => "expense",
            JournalCommand::Settle { .. } => "settle",
        }
    }
}

//! Journal command application
//!
//! Resolves the names carried by a [`JournalCommand`] to ids and routes the
//! command to the matching engine operation.

use crate::core::engine::SplitEngine;
use crate::core::traits::LedgerRepository;
use crate::types::{
    EntityKind, Group, JournalCommand, LedgerError, NewExpense, NewGroup, NewSettlement, NewUser,
    Split, User, UserId,
};

impl<S: LedgerRepository> SplitEngine<S> {
    /// Apply one journal command
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown usernames or group names, and any
    /// error of the underlying operation. A failed command writes nothing.
    pub fn apply(&self, command: JournalCommand) -> Result<(), LedgerError> {
        match command {
            JournalCommand::RegisterUser {
                username,
                email,
                full_name,
            } => {
                self.register_user(NewUser {
                    username,
                    email,
                    full_name,
                })?;
            }
            JournalCommand::AddFriend { user, friend } => {
                self.add_friend(self.resolve_user(&user)?.id, self.resolve_user(&friend)?.id)?;
            }
            JournalCommand::RemoveFriend { user, friend } => {
                self.remove_friend(self.resolve_user(&user)?.id, self.resolve_user(&friend)?.id)?;
            }
            JournalCommand::CreateGroup {
                name,
                creator,
                members,
                description,
            } => {
                let created_by = self.resolve_user(&creator)?.id;
                let member_ids = self.resolve_users(&members)?;
                self.create_group(NewGroup {
                    name,
                    description,
                    created_by,
                    member_ids,
                })?;
            }
            JournalCommand::AddMember { group, user } => {
                self.add_member(self.resolve_group(&group)?.id, self.resolve_user(&user)?.id)?;
            }
            JournalCommand::Expense {
                group,
                payer,
                amount,
                policy,
                participants,
                description,
            } => {
                let group_id = self.resolve_group(&group)?.id;
                let payer_id = self.resolve_user(&payer)?.id;
                let details = participants
                    .iter()
                    .map(|(username, value)| Ok((self.resolve_user(username)?.id, *value)))
                    .collect::<Result<Vec<_>, LedgerError>>()?;

                self.create_expense(NewExpense {
                    description,
                    total_amount: amount,
                    payer_id,
                    group_id,
                    split: Split::from_details(policy, details)?,
                })?;
            }
            JournalCommand::Settle {
                group,
                debtor,
                creditor,
                amount,
                note,
            } => {
                let group_id = self.resolve_group(&group)?.id;
                self.settle_up(NewSettlement {
                    debtor_id: self.resolve_user(&debtor)?.id,
                    creditor_id: self.resolve_user(&creditor)?.id,
                    group_id,
                    amount,
                    note,
                })?;
            }
        }

        Ok(())
    }

    fn resolve_user(&self, username: &str) -> Result<User, LedgerError> {
        self.store()
            .find_user_by_username(username)?
            .ok_or_else(|| LedgerError::not_found(EntityKind::User, username))
    }

    fn resolve_users(&self, usernames: &[String]) -> Result<Vec<UserId>, LedgerError> {
        usernames
            .iter()
            .map(|username| self.resolve_user(username).map(|user| user.id))
            .collect()
    }

    fn resolve_group(&self, name: &str) -> Result<Group, LedgerError> {
        self.store()
            .find_group_by_name(name)?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Group, name))
    }
}

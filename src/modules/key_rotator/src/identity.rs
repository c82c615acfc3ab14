/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/identity.rs
*
* Decides which object-store users are managed in this run. Two shapes of
* configuration are supported and both end in the same list of identities:
*
* - `users`: an explicit allow-list of `account/user` names, used verbatim.
* - `accounts`: an allow-list of accounts. Every user of a selected account is
*   managed unless its name is in the exclude-list. Users resolved this way
*   are addressed by id.
*
* SPDX-License-Identifier: Apache-2.0 */

use clap::ValueEnum;

use crate::config::{NameList, Settings};
use crate::error::Result;
use crate::models::{Identity, ObjectStoreAccount};
use crate::providers::StorageClient;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IdentitySource {
    /// Explicit list of user names.
    #[default]
    Users,
    /// Users of selected accounts, minus an exclude-list.
    Accounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResolver {
    AllowList(NameList),
    AccountScoped {
        accounts: NameList,
        excluded_users: NameList,
    },
}

impl IdentityResolver {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.identity_source {
            IdentitySource::Users => {
                if !settings.interesting_object_accounts.is_empty() {
                    tracing::warn!(
                        "INTERESTING_OBJECT_ACCOUNTS is ignored unless IDENTITY_SOURCE=accounts"
                    );
                }
                IdentityResolver::AllowList(settings.interesting_users.clone())
            }
            IdentitySource::Accounts => {
                if !settings.interesting_users.is_empty() {
                    tracing::warn!("INTERESTING_USERS is ignored when IDENTITY_SOURCE=accounts");
                }
                IdentityResolver::AccountScoped {
                    accounts: settings.interesting_object_accounts.clone(),
                    excluded_users: settings.excluded_user_names.clone(),
                }
            }
        }
    }

    /// True when the configuration cannot select anybody.
    pub fn is_empty(&self) -> bool {
        match self {
            IdentityResolver::AllowList(users) => users.is_empty(),
            IdentityResolver::AccountScoped { accounts, .. } => accounts.is_empty(),
        }
    }

    /// Produces the identities managed in this run.
    ///
    /// # Arguments
    /// * `storage` - Queried for accounts and users in account-scoped mode only.
    ///
    /// # Returns
    /// The identities in processing order, or the listing error.
    pub async fn resolve(&self, storage: &dyn StorageClient) -> Result<Vec<Identity>> {
        match self {
            IdentityResolver::AllowList(users) => {
                Ok(users.iter().map(|name| Identity::named(name.as_str())).collect())
            }
            IdentityResolver::AccountScoped {
                accounts,
                excluded_users,
            } => {
                let all_accounts = storage.list_accounts().await?;
                let selected = filter_accounts(all_accounts, accounts);
                tracing::debug!(count = selected.len(), "Selected object store accounts");

                let all_users = storage.list_users().await?;
                Ok(filter_users(&selected, all_users, excluded_users))
            }
        }
    }
}

pub fn filter_accounts(
    all_accounts: Vec<ObjectStoreAccount>,
    allowed: &NameList,
) -> Vec<ObjectStoreAccount> {
    all_accounts
        .into_iter()
        .filter(|account| allowed.contains(&account.name))
        .collect()
}

/// Keeps users belonging to one of `accounts` whose name is not excluded.
/// Listing order is preserved.
pub fn filter_users(
    accounts: &[ObjectStoreAccount],
    users: Vec<Identity>,
    excluded: &NameList,
) -> Vec<Identity> {
    users
        .into_iter()
        .filter(|user| {
            account_of(user).is_some_and(|name| accounts.iter().any(|a| a.name == name))
        })
        .filter(|user| !excluded.contains(&user.name))
        .collect()
}

/// The owning account: the listed reference when present, otherwise the
/// prefix of the `account/user` name.
fn account_of(user: &Identity) -> Option<&str> {
    user.account
        .as_deref()
        .or_else(|| user.name.split_once('/').map(|(account, _)| account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockStorageClient;

    fn account(name: &str) -> ObjectStoreAccount {
        ObjectStoreAccount {
            name: name.to_string(),
            id: Some(format!("{}-id", name)),
        }
    }

    fn user(account: &str, name: &str) -> Identity {
        Identity {
            name: format!("{}/{}", account, name),
            id: Some(format!("{}-{}-id", account, name)),
            account: Some(account.to_string()),
        }
    }

    fn mock_accounts() -> Vec<ObjectStoreAccount> {
        ["mock_hai", "mock_ana", "mock_bob", "mock_kai"]
            .into_iter()
            .map(account)
            .collect()
    }

    fn mock_users() -> Vec<Identity> {
        let mut users = Vec::new();
        for name in ["one", "two", "three", "four", "five"] {
            users.push(user("mock_hai", name));
        }
        for name in ["one", "two", "three"] {
            users.push(user("mock_ana", name));
        }
        users.push(user("mock_bob", "one"));
        users.push(user("mock_kai", "one"));
        users
    }

    #[test]
    fn test_filter_accounts() {
        let allowed = NameList::from_iter(["mock_hai", "mock_ana"]);
        let names: Vec<String> = filter_accounts(mock_accounts(), &allowed)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["mock_hai", "mock_ana"]);
    }

    #[test]
    fn test_filter_users() {
        let allowed = NameList::from_iter(["mock_hai", "mock_ana"]);
        let excluded = NameList::from_iter(["mock_ana/two"]);
        let accounts = filter_accounts(mock_accounts(), &allowed);

        let names: Vec<String> = filter_users(&accounts, mock_users(), &excluded)
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "mock_hai/one",
                "mock_hai/two",
                "mock_hai/three",
                "mock_hai/four",
                "mock_hai/five",
                "mock_ana/one",
                "mock_ana/three",
            ]
        );
    }

    #[test]
    fn test_filter_users_falls_back_to_name_prefix() {
        let accounts = vec![account("mock_hai")];
        let users = vec![Identity::named("mock_hai/one"), Identity::named("other/one")];
        let kept = filter_users(&accounts, users, &NameList::default());
        assert_eq!(kept, vec![Identity::named("mock_hai/one")]);
    }

    #[test]
    fn test_is_empty() {
        assert!(IdentityResolver::AllowList(NameList::default()).is_empty());
        assert!(!IdentityResolver::AllowList(NameList::from_iter(["a/b"])).is_empty());
        assert!(IdentityResolver::AccountScoped {
            accounts: NameList::default(),
            excluded_users: NameList::from_iter(["a/b"]),
        }
        .is_empty());
    }

    #[tokio::test]
    async fn test_allow_list_does_not_touch_storage() {
        let storage = MockStorageClient::new();
        let resolver = IdentityResolver::AllowList(NameList::from_iter(["acct/b", "acct/a"]));
        let identities = resolver.resolve(&storage).await.unwrap();
        assert_eq!(
            identities,
            vec![Identity::named("acct/a"), Identity::named("acct/b")]
        );
    }

    #[tokio::test]
    async fn test_account_scoped_resolution() {
        let mut storage = MockStorageClient::new();
        storage
            .expect_list_accounts()
            .times(1)
            .returning(|| Ok(mock_accounts()));
        storage
            .expect_list_users()
            .times(1)
            .returning(|| Ok(mock_users()));

        let resolver = IdentityResolver::AccountScoped {
            accounts: NameList::from_iter(["mock_ana"]),
            excluded_users: NameList::from_iter(["mock_ana/two"]),
        };
        let identities = resolver.resolve(&storage).await.unwrap();
        assert_eq!(identities, vec![user("mock_ana", "one"), user("mock_ana", "three")]);
        assert!(identities.iter().all(|i| i.id.is_some()));
    }
}

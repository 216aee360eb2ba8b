// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Core identifier and priority types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an account within a [`Ledger`](crate::Ledger).
///
/// Wraps the account's position in the ledger. It is used for lookups and
/// diagnostics only; no lock ordering is ever derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AccountId(pub usize);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority class of a withdrawal.
///
/// While any preferred withdrawal is outstanding on an account, every
/// ordinary withdrawal on that account blocks, even if funds would cover it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    #[default]
    Ordinary,
    Preferred,
}

impl Priority {
    pub fn is_preferred(self) -> bool {
        matches!(self, Priority::Preferred)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Ordinary => f.write_str("ordinary"),
            Priority::Preferred => f.write_str("preferred"),
        }
    }
}

//! Account transport record and its embedded quote.

use serde::{Deserialize, Serialize};

/// Account record as carried on the wire.
///
/// Field names are fixed by the service contract. Peers rely on the exact
/// spelling of `servedBy` and `imageUrl`; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique account identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Identifier of the node that served this record. Informational.
    pub served_by: String,

    /// Quote attached to the account.
    pub quote: Quote,

    /// URL of the account image.
    pub image_url: String,
}

/// Quote embedded in an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Free-text quote content. Carried as `quote` on the wire.
    #[serde(rename = "quote")]
    pub text: String,

    /// Identifier of the node that produced the quote. The wire name is
    /// `ipAddress` for historical reasons.
    pub ip_address: String,

    /// Language tag.
    pub language: String,
}

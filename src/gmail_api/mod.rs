//! Gmail API module split into logical submodules
//!
//! This module provides all Gmail API functionality organized into:
//! - auth: Service account and OAuth2 user authorization
//! - token: The cached OAuth2 user token and its file store
//! - messages: Message listing and metadata fetching

pub mod auth;
pub mod messages;
pub mod token;

pub use auth::{authorize, AccessTokenSource, AuthorizedClient, ConsentPrompt, ConsolePrompt};
pub use messages::{list_all_message_ids, GmailClient, MailApi};
pub use token::{Token, TokenStore};

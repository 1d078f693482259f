/*!
 * Authentication context extractors
 *
 * Responsibility:
 * - 認証済みリクエストのコンテキスト (Identity) を handler に提供する
 * - The identity itself is produced by the policy stage, or on demand by MaybeUser
 *
 * Public API:
 * - CurrentUser (required identity)
 * - MaybeUser (optional identity, resolved lazily on PUBLIC routes)
 */

mod core;

pub use core::{CurrentUser, MaybeUser};

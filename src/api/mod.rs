/*
 * Responsibility
 * - response: envelope + Reply (response contract)
 * - router: policy-gated route registration
 * - v1: concrete routes and handlers
 */
pub mod response;
pub mod router;
pub mod v1;

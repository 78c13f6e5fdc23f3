// Life of a request:
// 1. HTTP request comes in (axum router in `server`)
// 2. Handler delegates to `AuthService`
// 3. For login:
//     - Open a store session, look up the credential record
//     - Verify the password (bcrypt, on the blocking pool)
//     - Issue a signed access token
//    For profile access:
//     - Extract the bearer token
//     - Verify signature and expiry
//     - Look up the subject, project it onto its public profile
// 4. The store session is committed or rolled back, the response serialized
//
// System components:
//  - Credential store (Postgres or in-memory)
//  - Password verifier and token codec
//  - HTTP router

pub mod auth;
pub mod config;
pub mod server;
pub mod store;
pub mod time;

#[cfg(test)]
mod testing;

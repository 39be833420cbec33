// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod auth;
pub mod db;
pub mod repositories;
pub mod template_seed;

pub use auth::StaticAuthResolver;
pub use template_seed::TemplateSeed;

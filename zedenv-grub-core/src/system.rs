// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Host system seams: filesystem checks, external commands and logging.

pub mod command;
pub mod fs;
pub mod log_backend;

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity and position types.

pub mod id;
pub mod principal;

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use parley_kernel::digest;

pub fn digest_hex(text: &str) -> String {
    digest(text).to_hex()
}

pub fn run(text: &str) -> anyhow::Result<()> {
    println!("{}", digest_hex(text));
    Ok(())
}

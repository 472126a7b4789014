// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate distinct phone numbers.
pub fn generate_phone_numbers(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("+1555{:07}", i)).collect()
}

/// Origins that must not pass the gate.
pub fn generate_hostile_origins() -> Vec<&'static str> {
    vec![
        "https://evil.example.net",
        "https://waitlist.example.com.evil.net",
        "https://evil.waitlist.example.com",
        "http://waitlist.example.com",
        "https://waitlist.example.com/",
        "https://waitlist.example.com:443",
        "HTTPS://WAITLIST.EXAMPLE.COM",
        "null",
        "*",
        "",
    ]
}

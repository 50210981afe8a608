//! Main entry point for Near2EthRelayer

#![deny(warnings, missing_docs, trivial_casts, unused_qualifications)]
#![forbid(unsafe_code)]

use near2eth_relayer::application::APP;

/// Boot Near2EthRelayer
fn main() {
    abscissa_core::boot(&APP);
}

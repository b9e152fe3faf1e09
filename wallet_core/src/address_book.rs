//! Recipient parsing, validation and ENS resolution.
//!
//! Free text is processed in three steps so that the concurrent part never
//! touches the book itself:
//!
//! 1. [`AddressBook::plan`] splits and classifies the text into a
//!    [`ResolutionBatch`] tagged with a fresh batch id.
//! 2. [`ResolutionBatch::resolve`] looks up all ENS names concurrently and
//!    returns a [`BatchOutcome`].
//! 3. [`AddressBook::merge`] folds the outcome into the book, unless a newer
//!    batch was planned in the meantime, in which case it is discarded.
//!
//! [`AddressBook::ingest`] runs all three back to back.

use std::collections::{HashMap, HashSet};
use std::fmt;

use alloy_primitives::Address;
use futures_util::future::join_all;
use splitter_rpc::{ens, EnsResolver};
use splitter_types::RecipientAddress;
use splitter_utils::pluralize;

use crate::error::SplitError;

/// An entry of the most recent batch that could not be accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidEntry {
    /// The token as the user typed it.
    pub input: String,
    pub reason: SplitError,
}

impl fmt::Display for InvalidEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.input, self.reason)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingName {
    input: String,
    normalized: String,
}

/// One accepted token of a batch, in typed order.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    Hex(RecipientAddress),
    Name(PendingName),
}

/// A slot after resolution. Names that failed are dropped into the invalid set.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Resolved {
    Hex(RecipientAddress),
    Name(String, RecipientAddress),
}

/// Classified, deduplicated input waiting for ENS resolution.
#[derive(Clone, Debug)]
pub struct ResolutionBatch {
    id: u64,
    slots: Vec<Slot>,
    invalid: Vec<InvalidEntry>,
    duplicates: usize,
}

/// Results of resolving a batch, ready to be merged.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    batch_id: u64,
    resolved: Vec<Resolved>,
    invalid: Vec<InvalidEntry>,
    duplicates: usize,
}

/// What a merge changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub batch_id: u64,
    /// The batch was superseded and nothing was merged.
    pub stale: bool,
    pub added: Vec<RecipientAddress>,
    pub invalid: Vec<InvalidEntry>,
    /// Entries skipped because they were already present.
    pub duplicates: usize,
}

/// The accepted recipients, in the order they were typed.
///
/// The order matters: in unequal mode the n-th amount pays the n-th recipient.
/// ENS names keep their typed position even when hex entries follow them.
#[derive(Clone, Debug, Default)]
pub struct AddressBook {
    accepted: Vec<RecipientAddress>,
    /// Normalised ENS name → the address it resolved to.
    aliases: HashMap<String, RecipientAddress>,
    invalid: Vec<InvalidEntry>,
    batch_id: u64,
}

/// Split on any run of commas and whitespace.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `text` into a new batch, superseding any batch still in flight.
    ///
    /// Clears the invalid set: it always describes the latest batch.
    pub fn plan(&mut self, text: &str) -> ResolutionBatch {
        self.batch_id += 1;
        self.invalid.clear();

        let mut batch = ResolutionBatch {
            id: self.batch_id,
            slots: Vec::new(),
            invalid: Vec::new(),
            duplicates: 0,
        };
        let mut seen_addresses: HashSet<RecipientAddress> = self.accepted.iter().copied().collect();
        let mut seen_names: HashSet<String> = self.aliases.keys().cloned().collect();

        for token in tokenize(text) {
            if ens::is_ens_name(token) {
                match ens::normalize(token) {
                    Ok(normalized) => {
                        if seen_names.insert(normalized.clone()) {
                            tracing::debug!(input = token, name = %normalized, "recipient is an ENS name");
                            batch.slots.push(Slot::Name(PendingName {
                                input: token.to_string(),
                                normalized,
                            }));
                        } else {
                            batch.duplicates += 1;
                        }
                    }
                    Err(e) => batch.invalid.push(InvalidEntry {
                        input: token.to_string(),
                        reason: SplitError::Resolution {
                            name: token.to_string(),
                            reason: e.to_string(),
                        },
                    }),
                }
                continue;
            }

            match RecipientAddress::parse(token) {
                Ok(address) => {
                    if seen_addresses.insert(address) {
                        tracing::debug!(input = token, %address, "recipient is a hex address");
                        batch.slots.push(Slot::Hex(address));
                    } else {
                        batch.duplicates += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!(input = token, error = %e, "recipient rejected");
                    batch.invalid.push(InvalidEntry {
                        input: token.to_string(),
                        reason: e.into(),
                    });
                }
            }
        }
        batch
    }

    /// Fold a resolved batch into the book. Outcomes of superseded batches are dropped.
    pub fn merge(&mut self, outcome: BatchOutcome) -> MergeReport {
        if outcome.batch_id != self.batch_id {
            tracing::debug!(
                batch = outcome.batch_id,
                current = self.batch_id,
                "discarding superseded recipient batch"
            );
            return MergeReport {
                batch_id: outcome.batch_id,
                stale: true,
                ..MergeReport::default()
            };
        }

        let mut report = MergeReport {
            batch_id: outcome.batch_id,
            duplicates: outcome.duplicates,
            ..MergeReport::default()
        };

        for entry in outcome.resolved {
            match entry {
                Resolved::Hex(address) => self.push(address, &mut report),
                Resolved::Name(name, address) => {
                    self.aliases.insert(name, address);
                    self.push(address, &mut report);
                }
            }
        }

        self.invalid = outcome.invalid;
        report.invalid = self.invalid.clone();

        tracing::info!(
            batch = report.batch_id,
            added = report.added.len(),
            invalid = report.invalid.len(),
            duplicates = report.duplicates,
            "merged {}",
            pluralize(self.accepted.len(), "recipient")
        );
        report
    }

    fn push(&mut self, address: RecipientAddress, report: &mut MergeReport) {
        if self.accepted.contains(&address) {
            report.duplicates += 1;
        } else {
            self.accepted.push(address);
            report.added.push(address);
        }
    }

    /// Plan, resolve and merge `text` in one go.
    pub async fn ingest<R>(&mut self, text: &str, resolver: &R) -> MergeReport
    where
        R: EnsResolver + ?Sized,
    {
        let batch = self.plan(text);
        let outcome = batch.resolve(resolver).await;
        self.merge(outcome)
    }

    /// Remove the recipient at `index`.
    ///
    /// Any ENS alias that resolved to it is forgotten, so entering the name
    /// again resolves it afresh. The reverse record is consulted as well, for
    /// names that reached the book some other way.
    pub async fn remove<R>(&mut self, index: usize, resolver: &R) -> Result<RecipientAddress, SplitError>
    where
        R: EnsResolver + ?Sized,
    {
        if index >= self.accepted.len() {
            return Err(SplitError::InputValidation(format!(
                "no recipient at position {index} ({} accepted)",
                self.accepted.len()
            )));
        }
        let removed = self.accepted.remove(index);
        self.aliases.retain(|_, address| *address != removed);

        match resolver.lookup_address(removed.as_address()).await {
            Ok(Some(name)) => {
                if let Ok(normalized) = ens::normalize(&name) {
                    self.aliases.remove(&normalized);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(address = %removed, error = %e, "reverse ENS lookup failed");
            }
        }

        tracing::info!(address = %removed, remaining = self.accepted.len(), "recipient removed");
        Ok(removed)
    }

    /// Forget every recipient and supersede any batch in flight.
    pub fn clear(&mut self) {
        self.accepted.clear();
        self.aliases.clear();
        self.invalid.clear();
        self.batch_id += 1;
    }

    pub fn accepted(&self) -> &[RecipientAddress] {
        &self.accepted
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.accepted.iter().map(RecipientAddress::as_address).collect()
    }

    /// Entries of the latest batch that were rejected.
    pub fn invalid(&self) -> &[InvalidEntry] {
        &self.invalid
    }

    /// ENS name an accepted recipient was entered as, if any.
    pub fn name_of(&self, address: &RecipientAddress) -> Option<&str> {
        let mut names: Vec<&String> = self
            .aliases
            .iter()
            .filter(|(_, a)| *a == address)
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names.first().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

impl ResolutionBatch {
    /// Resolve every ENS name concurrently.
    ///
    /// A lookup that errors or finds no address makes that entry invalid; the
    /// rest of the batch is unaffected. Hex entries and resolved names stay in
    /// typed order.
    pub async fn resolve<R>(self, resolver: &R) -> BatchOutcome
    where
        R: EnsResolver + ?Sized,
    {
        let lookups = self.slots.iter().filter_map(|slot| match slot {
            Slot::Name(name) => Some(resolver.resolve_name(&name.normalized)),
            Slot::Hex(_) => None,
        });
        let mut results = join_all(lookups).await.into_iter();

        let mut outcome = BatchOutcome {
            batch_id: self.id,
            resolved: Vec::with_capacity(self.slots.len()),
            invalid: self.invalid,
            duplicates: self.duplicates,
        };

        for slot in self.slots {
            let name = match slot {
                Slot::Hex(address) => {
                    outcome.resolved.push(Resolved::Hex(address));
                    continue;
                }
                Slot::Name(name) => name,
            };
            let Some(result) = results.next() else {
                break;
            };
            let failure = match result {
                Ok(Some(address)) => {
                    tracing::debug!(name = %name.normalized, %address, "ENS name resolved");
                    outcome
                        .resolved
                        .push(Resolved::Name(name.normalized, RecipientAddress::new(address)));
                    continue;
                }
                Ok(None) => "name does not resolve to an address".to_string(),
                Err(e) => e.to_string(),
            };
            tracing::warn!(name = %name.normalized, reason = %failure, "ENS resolution failed");
            outcome.invalid.push(InvalidEntry {
                reason: SplitError::Resolution {
                    name: name.input.clone(),
                    reason: failure,
                },
                input: name.input,
            });
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitter_nullables::NullResolver;
    use std::time::Duration;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const LOWER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[test]
    fn tokenizes_on_any_separator_run() {
        let tokens: Vec<&str> = tokenize(" a,b  c,\n,d\t").collect();
        assert_eq!(tokens, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn same_address_in_both_spellings_is_one_recipient() {
        let mut book = AddressBook::new();
        let report = book
            .ingest(&format!("{CHECKSUMMED}, {LOWER}\n{CHECKSUMMED}"), &NullResolver::new())
            .await;
        assert_eq!(book.len(), 1);
        assert_eq!(report.duplicates, 2);
        assert!(book.invalid().is_empty());

        let again = book.ingest(LOWER, &NullResolver::new()).await;
        assert!(again.added.is_empty());
        assert_eq!(book.len(), 1);
    }

    #[tokio::test]
    async fn malformed_entries_do_not_stop_the_batch() {
        let mut book = AddressBook::new();
        let bad_checksum = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        book.ingest(&format!("0x123 {bad_checksum} {LOWER} hello"), &NullResolver::new())
            .await;
        assert_eq!(book.len(), 1);
        let invalid: Vec<&str> = book.invalid().iter().map(|e| e.input.as_str()).collect();
        assert_eq!(invalid, vec!["0x123", bad_checksum, "hello"]);
    }

    #[tokio::test]
    async fn unresolved_names_are_invalid_not_accepted() {
        let resolver = NullResolver::new();
        resolver.register("alice.eth", addr(1));
        resolver.fail("broken.eth");

        let mut book = AddressBook::new();
        book.ingest("alice.eth nobody.eth broken.eth", &resolver).await;

        assert_eq!(book.addresses(), vec![addr(1)]);
        let invalid: Vec<&str> = book.invalid().iter().map(|e| e.input.as_str()).collect();
        assert_eq!(invalid, vec!["nobody.eth", "broken.eth"]);
        assert!(book
            .invalid()
            .iter()
            .all(|e| matches!(e.reason, SplitError::Resolution { .. })));
    }

    #[tokio::test]
    async fn mixed_entries_keep_typed_order() {
        let resolver = NullResolver::new();
        resolver.register("alice.eth", addr(1));
        resolver.register("bob.eth", addr(2));
        resolver.delay("alice.eth", Duration::from_millis(20));

        let mut book = AddressBook::new();
        let text = format!(
            "alice.eth {} bob.eth {}",
            RecipientAddress::new(addr(3)),
            RecipientAddress::new(addr(4))
        );
        book.ingest(&text, &resolver).await;

        assert_eq!(book.addresses(), vec![addr(1), addr(3), addr(2), addr(4)]);
        assert_eq!(book.name_of(&RecipientAddress::new(addr(2))), Some("bob.eth"));
    }

    #[tokio::test]
    async fn failed_name_leaves_neighbours_in_order() {
        let resolver = NullResolver::new();
        resolver.register("carol.eth", addr(5));

        let mut book = AddressBook::new();
        let text = format!(
            "{} nobody.eth carol.eth",
            RecipientAddress::new(addr(6))
        );
        book.ingest(&text, &resolver).await;

        assert_eq!(book.addresses(), vec![addr(6), addr(5)]);
        assert_eq!(book.invalid()[0].input, "nobody.eth");
    }

    #[tokio::test]
    async fn resolved_names_are_not_looked_up_again() {
        let resolver = NullResolver::new();
        resolver.register("alice.eth", addr(1));

        let mut book = AddressBook::new();
        book.ingest("alice.eth", &resolver).await;
        let report = book.ingest("Alice.ETH", &resolver).await;

        assert_eq!(resolver.lookups(), vec!["alice.eth".to_string()]);
        assert_eq!(report.duplicates, 1);
        assert_eq!(book.len(), 1);
    }

    #[tokio::test]
    async fn name_resolving_to_known_address_is_a_duplicate() {
        let resolver = NullResolver::new();
        resolver.register("alice.eth", addr(1));

        let mut book = AddressBook::new();
        let hex = RecipientAddress::new(addr(1)).to_lowercase_hex();
        let report = book.ingest(&format!("{hex} alice.eth"), &resolver).await;
        assert_eq!(book.len(), 1);
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn superseded_batch_is_discarded() {
        let resolver = NullResolver::new();
        resolver.register("slow.eth", addr(1));

        let mut book = AddressBook::new();
        let first = book.plan("slow.eth");
        let second = book.plan(&RecipientAddress::new(addr(2)).to_string());

        let late = first.resolve(&resolver).await;
        let report = book.merge(late);
        assert!(report.stale);
        assert!(book.is_empty());

        book.merge(second.resolve(&resolver).await);
        assert_eq!(book.addresses(), vec![addr(2)]);
    }

    #[tokio::test]
    async fn invalid_set_describes_latest_batch() {
        let mut book = AddressBook::new();
        book.ingest("nope", &NullResolver::new()).await;
        assert_eq!(book.invalid().len(), 1);
        book.ingest(LOWER, &NullResolver::new()).await;
        assert!(book.invalid().is_empty());
    }

    #[tokio::test]
    async fn removing_an_ens_recipient_allows_reentry() {
        let resolver = NullResolver::new();
        resolver.register("alice.eth", addr(1));

        let mut book = AddressBook::new();
        book.ingest("alice.eth", &resolver).await;
        let removed = book.remove(0, &resolver).await.unwrap();
        assert_eq!(removed.as_address(), addr(1));
        assert!(book.is_empty());

        let report = book.ingest("alice.eth", &resolver).await;
        assert_eq!(report.added.len(), 1);
        assert_eq!(resolver.lookups().len(), 2);
    }

    #[tokio::test]
    async fn remove_out_of_range_is_an_input_error() {
        let mut book = AddressBook::new();
        assert!(matches!(
            book.remove(0, &NullResolver::new()).await,
            Err(SplitError::InputValidation(_))
        ));
    }

    #[tokio::test]
    async fn clear_supersedes_in_flight_batch() {
        let mut book = AddressBook::new();
        let batch = book.plan(LOWER);
        book.clear();
        let report = book.merge(batch.resolve(&NullResolver::new()).await);
        assert!(report.stale);
        assert!(book.is_empty());
    }
}

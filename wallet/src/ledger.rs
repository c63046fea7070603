//! # The Ledger
//!
//! An in-process double of the execution environment: accounts and
//! balances, a logical clock, duplicate-message suppression, and the
//! transaction reports the environment would hand back. This is the
//! boundary everything above the wallet contract talks to; nothing in
//! here is consensus code.
//!
//! One call to [`Ledger::send_external`] performs the whole lifecycle
//! the environment would: accept-or-refuse the envelope, run the
//! authentication gate, deploy on first contact when a state init is
//! attached, dispatch, settle value movements, and return the root
//! [`Transaction`] with the credit-side transactions embedded as its
//! children.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use lumen_protocol::address::Address;
use lumen_protocol::call::ExternalCall;
use lumen_protocol::cell::{Cell, CellError};
use lumen_protocol::config::RESULT_CODE_OK;
use lumen_protocol::crypto::sha256_array;
use lumen_protocol::message::OutboundMessage;

use crate::auth::{self, Verdict};
use crate::dispatch;
use crate::state::{AccountStatus, StateError, WalletState};

/// Errors that refuse an external call before any transaction exists.
///
/// These are distinct from an *aborted* transaction: a refused envelope
/// produces no [`Transaction`] at all, the way the environment drops a
/// message at admission rather than executing it.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An identical envelope was already processed. Fresh header `time`
    /// values keep legitimate repeats byte-distinct, so this only fires
    /// on a literal replay.
    #[error("duplicate external message")]
    DuplicateMessage,

    /// The destination account does not exist and the call carried no
    /// state init to create it.
    #[error("account {0} does not exist")]
    UnknownAccount(Address),

    /// The attached state init does not hash to the destination
    /// address.
    #[error("state init hash does not match destination {0}")]
    AddressMismatch(Address),

    /// The account exists but holds no contract and the call carried no
    /// state init.
    #[error("account {0} is not deployed")]
    AccountNotDeployed(Address),

    /// The attached state init cell is not a wallet state record.
    #[error("bad state init: {0}")]
    StateInit(#[from] StateError),

    /// The envelope could not be encoded for admission hashing.
    #[error("envelope encoding failed: {0}")]
    Envelope(#[from] CellError),
}

/// A processed transaction report.
///
/// `children` are the credit-side transactions the settled outbound
/// messages produced, in message order. `out_messages[i]` and
/// `children[i]` describe the same transfer from the two sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Hex transaction id, unique within the ledger.
    pub id: String,
    /// The account the transaction ran on.
    pub account: Address,
    /// Account status before execution.
    pub orig_status: AccountStatus,
    /// Account status after execution.
    pub end_status: AccountStatus,
    /// Whether execution aborted before committing effects.
    pub aborted: bool,
    /// Exit code of an aborted transaction, if any.
    pub exit_code: Option<i32>,
    /// Result code of the completed action phase.
    pub result_code: i32,
    /// Messages the transaction emitted, in request order.
    pub out_messages: Vec<OutboundMessage>,
    /// Credit-side transactions of the settled messages.
    pub children: Vec<Transaction>,
}

/// One account of the book.
#[derive(Debug, Clone)]
struct Account {
    balance: u128,
    status: AccountStatus,
    wallet: Option<WalletState>,
}

/// A point-in-time snapshot of one account, for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    /// Balance in nanolumen.
    pub balance: u128,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Deployed wallet state, if the account is active.
    pub wallet: Option<WalletState>,
}

/// The mutable book behind the ledger lock.
struct Book {
    accounts: HashMap<Address, Account>,
    /// Repr hashes of every admitted envelope.
    seen: HashSet<[u8; 32]>,
    /// Logical clock, unix seconds.
    now_secs: u64,
}

/// The execution environment double. Cheap to clone; clones share the
/// same book.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<Mutex<Book>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Creates an empty ledger with the clock at the current wall time.
    pub fn new() -> Self {
        let now_secs = Utc::now().timestamp().max(0) as u64;
        Self {
            inner: Arc::new(Mutex::new(Book {
                accounts: HashMap::new(),
                seen: HashSet::new(),
                now_secs,
            })),
        }
    }

    /// Credits `value` to `address`, creating the account if needed.
    /// Credits never activate an account.
    pub fn fund(&self, address: Address, value: u128) {
        let mut book = self.inner.lock();
        let account = book.accounts.entry(address).or_insert_with(Account::uninit);
        account.balance = account.balance.saturating_add(value);
        debug!(%address, value, balance = account.balance, "funded account");
    }

    /// The account's balance in nanolumen, zero if it does not exist.
    pub fn balance_of(&self, address: &Address) -> u128 {
        self.inner
            .lock()
            .accounts
            .get(address)
            .map_or(0, |a| a.balance)
    }

    /// The account's lifecycle status. An unknown address reports
    /// [`AccountStatus::Uninitialized`], same as a funded-but-undeployed
    /// one.
    pub fn status(&self, address: &Address) -> AccountStatus {
        self.inner
            .lock()
            .accounts
            .get(address)
            .map_or(AccountStatus::Uninitialized, |a| a.status)
    }

    /// The deployed wallet state at `address`, if any.
    pub fn wallet_state(&self, address: &Address) -> Option<WalletState> {
        self.inner
            .lock()
            .accounts
            .get(address)
            .and_then(|a| a.wallet.clone())
    }

    /// A full snapshot of the account: balance, status, wallet state.
    /// An unknown address reads as an empty uninitialized account.
    pub fn account_state(&self, address: &Address) -> AccountView {
        let book = self.inner.lock();
        match book.accounts.get(address) {
            Some(a) => AccountView {
                balance: a.balance,
                status: a.status,
                wallet: a.wallet.clone(),
            },
            None => AccountView {
                balance: 0,
                status: AccountStatus::Uninitialized,
                wallet: None,
            },
        }
    }

    /// Sets the logical clock, unix seconds.
    pub fn set_time(&self, now_secs: u64) {
        self.inner.lock().now_secs = now_secs;
    }

    /// Advances the logical clock.
    pub fn advance_time(&self, secs: u64) {
        let mut book = self.inner.lock();
        book.now_secs += secs;
    }

    /// The logical clock, unix seconds.
    pub fn now(&self) -> u64 {
        self.inner.lock().now_secs
    }

    /// Delivers an external call to `to`, optionally deploying with the
    /// attached state init, and returns the root transaction report.
    ///
    /// A [`LedgerError`] means the envelope was refused at admission and
    /// no transaction ran. A rejected call *does* produce a transaction,
    /// aborted with the gate's exit code and no state change (for a
    /// deploying call, the account stays uninitialized).
    pub fn send_external(
        &self,
        to: Address,
        call: &ExternalCall,
        state_init: Option<&Cell>,
    ) -> Result<Transaction, LedgerError> {
        let envelope_hash = *call.encode()?.repr_hash();

        let mut book = self.inner.lock();

        if book.seen.contains(&envelope_hash) {
            warn!(%to, "refusing duplicate external message");
            return Err(LedgerError::DuplicateMessage);
        }

        // Resolve the wallet state the call will run against. Deploying
        // state is not committed yet; activation happens only after the
        // call authorizes and dispatches.
        let orig_status = book
            .accounts
            .get(&to)
            .map_or(AccountStatus::Uninitialized, |a| a.status);
        let (state, deploying) = match (orig_status, state_init) {
            (AccountStatus::Active, _) => {
                // Already deployed; a redundant state init is ignored.
                let account = book
                    .accounts
                    .get(&to)
                    .ok_or(LedgerError::UnknownAccount(to))?;
                let state = account
                    .wallet
                    .clone()
                    .ok_or(LedgerError::AccountNotDeployed(to))?;
                (state, false)
            }
            (AccountStatus::Uninitialized, Some(init)) => {
                if Address::from_state_init(init) != to {
                    return Err(LedgerError::AddressMismatch(to));
                }
                (WalletState::decode_state_init(init)?, true)
            }
            (AccountStatus::Uninitialized, None) => {
                return if book.accounts.contains_key(&to) {
                    Err(LedgerError::AccountNotDeployed(to))
                } else {
                    Err(LedgerError::UnknownAccount(to))
                };
            }
        };

        // Admitted: from here the envelope executes exactly once, so
        // only now does it consume its duplicate slot. A refusal above
        // leaves the hash unknown and the envelope retryable.
        book.seen.insert(envelope_hash);

        let now = book.now_secs;

        // Authentication gate.
        if let Verdict::Rejected(reason) = auth::authorize(call, &state, now) {
            let tx = Transaction {
                id: hex::encode(envelope_hash),
                account: to,
                orig_status,
                end_status: orig_status,
                aborted: true,
                exit_code: Some(reason.exit_code()),
                result_code: RESULT_CODE_OK,
                out_messages: Vec::new(),
                children: Vec::new(),
            };
            info!(%to, exit_code = reason.exit_code(), "external call rejected");
            return Ok(tx);
        }

        let balance = book.accounts.get(&to).map_or(0, |a| a.balance);

        // Dispatch.
        let out_messages = match dispatch::dispatch_call(call.selector, &call.body, balance) {
            Ok(out) => out,
            Err(err) => {
                let tx = Transaction {
                    id: hex::encode(envelope_hash),
                    account: to,
                    orig_status,
                    end_status: orig_status,
                    aborted: true,
                    exit_code: Some(err.exit_code()),
                    result_code: RESULT_CODE_OK,
                    out_messages: Vec::new(),
                    children: Vec::new(),
                };
                info!(%to, exit_code = err.exit_code(), "external call aborted in dispatch");
                return Ok(tx);
            }
        };

        // Commit: activate on deploy, then settle each message.
        let account = book.accounts.entry(to).or_insert_with(Account::uninit);
        if deploying {
            account.status = AccountStatus::Active;
            account.wallet = Some(state);
            info!(%to, "wallet deployed");
        }

        let mut children = Vec::with_capacity(out_messages.len());
        for (index, msg) in out_messages.iter().enumerate() {
            let sender = book
                .accounts
                .get_mut(&to)
                .ok_or(LedgerError::UnknownAccount(to))?;
            match sender.balance.checked_sub(msg.value) {
                Some(rest) => sender.balance = rest,
                None => {
                    // The dispatch engine already checked affordability;
                    // a shortfall here would mean the book changed under
                    // the lock, which it cannot. Skip rather than wrap.
                    warn!(%to, index, value = msg.value, "settlement shortfall, skipping message");
                    continue;
                }
            }

            let dest = book
                .accounts
                .entry(msg.destination)
                .or_insert_with(Account::uninit);
            let dest_orig = dest.status;
            dest.balance = dest.balance.saturating_add(msg.value);

            let mut seed = Vec::with_capacity(40);
            seed.extend_from_slice(&envelope_hash);
            seed.extend_from_slice(&(index as u64).to_be_bytes());
            children.push(Transaction {
                id: hex::encode(sha256_array(&seed)),
                account: msg.destination,
                orig_status: dest_orig,
                end_status: dest_orig,
                aborted: false,
                exit_code: None,
                result_code: RESULT_CODE_OK,
                out_messages: Vec::new(),
                children: Vec::new(),
            });
            debug!(from = %to, dest = %msg.destination, value = msg.value, "settled transfer");
        }

        let end_status = book
            .accounts
            .get(&to)
            .map_or(orig_status, |a| a.status);

        Ok(Transaction {
            id: hex::encode(envelope_hash),
            account: to,
            orig_status,
            end_status,
            aborted: false,
            exit_code: None,
            result_code: RESULT_CODE_OK,
            out_messages,
            children,
        })
    }
}

impl Account {
    fn uninit() -> Self {
        Self {
            balance: 0,
            status: AccountStatus::Uninitialized,
            wallet: None,
        }
    }
}

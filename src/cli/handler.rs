//! Command handlers.

use std::{fs, path::Path};

use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{Cli, CliError, CliResult, Commands, KeyArgs, SignArgs};
use crate::{
    account::Address,
    config::TokenConfig,
    contract::Call,
    envelope::CallEnvelope,
    store::Store,
};

pub fn run(cli: Cli) -> CliResult<()> {
    let state = cli.state.as_path();
    match cli.command {
        Commands::Keygen { out_dir } => keygen(&out_dir),
        Commands::Init { config, force } => {
            let config = TokenConfig::from_json_file(&config)?;
            let store = Store::init(state, config, force)?;
            print_json(&json!({
                "state": store.path().display().to_string(),
                "deployment": store.deployment(),
                "variant": store.token().governance().variant(),
                "cap": store.token().cap().to_string(),
                "total_supply": store.token().total_supply().to_string(),
            }))
        }

        Commands::Reward {
            target,
            amount,
            reason,
            sign,
        } => submit_call(
            state,
            &sign,
            Call::RewardStudent {
                target,
                amount,
                reason,
            },
        ),
        Commands::RewardUnit {
            target,
            reason,
            sign,
        } => submit_call(state, &sign, Call::RewardWithUnit { target, reason }),
        Commands::Submit {
            target,
            amount,
            reason,
            sign,
        } => submit_call(
            state,
            &sign,
            Call::SubmitTransaction {
                target,
                amount,
                reason,
            },
        ),
        Commands::Confirm { id, sign } => submit_call(state, &sign, Call::ConfirmTransaction { id }),
        Commands::Revoke { id, sign } => submit_call(state, &sign, Call::RevokeConfirmation { id }),
        Commands::Execute { id, sign } => submit_call(state, &sign, Call::ExecuteTransaction { id }),
        Commands::Transfer { to, amount, sign } => {
            submit_call(state, &sign, Call::Transfer { to, amount })
        }
        Commands::Redeem { item, cost, sign } => submit_call(
            state,
            &sign,
            Call::BuyGoodies {
                item_name: item,
                cost,
            },
        ),
        Commands::Apply { envelope } => {
            let envelope: CallEnvelope = serde_json::from_slice(&fs::read(&envelope)?)?;
            apply(state, envelope)
        }

        Commands::Balance { account } => {
            let store = Store::open(state)?;
            print_json(&json!({
                "account": account,
                "balance": store.token().balance_of(&account).to_string(),
            }))
        }
        Commands::Supply => {
            let store = Store::open(state)?;
            let token = store.token();
            print_json(&json!({
                "cap": token.cap().to_string(),
                "total_supply": token.total_supply().to_string(),
                "decimals": token.decimals(),
            }))
        }
        Commands::Achievements {
            account,
            offset,
            limit,
        } => {
            let store = Store::open(state)?;
            let limit = limit.unwrap_or(usize::MAX);
            print_json(&store.token().achievements_page(&account, offset, limit))
        }
        Commands::Tx { id } => {
            let store = Store::open(state)?;
            let tx = store
                .token()
                .transaction_at(id)
                .ok_or_else(|| CliError::not_found(format!("transaction {id}")))?;
            print_json(&json!({
                "id": tx.id,
                "target": tx.target,
                "amount": tx.amount.to_string(),
                "reason": tx.reason,
                "executed": tx.executed,
                "confirmations": tx.num_confirmations(),
            }))
        }
        Commands::TxCount => {
            let store = Store::open(state)?;
            println!("{}", store.token().transaction_count());
            Ok(())
        }
        Commands::Approvers => {
            let store = Store::open(state)?;
            let token = store.token();
            print_json(&json!({
                "variant": token.governance().variant(),
                "administrator": token.administrator(),
                "approvers": token.approvers(),
                "required_confirmations": token.required_confirmations(),
            }))
        }
        Commands::Events { since } => {
            let store = Store::open(state)?;
            for event in store.token().events_since(since) {
                println!("{}", serde_json::to_string(event)?);
            }
            Ok(())
        }
        Commands::Verify => {
            // opening already checks the state root and supply invariants
            let store = Store::open(state)?;
            print_json(&json!({
                "ok": true,
                "state_root": hex::encode(store.token().state_root()),
                "transactions": store.token().transaction_count(),
                "events": store.token().events().len(),
            }))
        }
    }
}

/// Signs `call` with the caller key for the deployment in `state`, then
/// either writes the envelope out or applies it.
fn submit_call(state: &Path, sign: &SignArgs, call: Call) -> CliResult<()> {
    let sk = load_key(&sign.key)?;
    let deployment = Store::open(state)?.deployment();
    let envelope = match sign.nonce {
        Some(nonce) => CallEnvelope::seal(&sk, deployment, nonce, call),
        None => CallEnvelope::seal_random(&sk, deployment, call),
    };
    match &sign.sign_only {
        Some(out) => {
            fs::write(out, serde_json::to_vec_pretty(&envelope)?)?;
            print_json(&json!({
                "envelope": out.display().to_string(),
                "caller": envelope.caller,
                "deployment": envelope.deployment,
                "digest": hex::encode(envelope.digest()),
            }))
        }
        None => apply(state, envelope),
    }
}

fn apply(state: &Path, envelope: CallEnvelope) -> CliResult<()> {
    let mut store = Store::open(state)?;
    debug!(call = envelope.call.name(), caller = %envelope.caller, "applying envelope");
    let events = store.apply(envelope)?;
    store.save()?;
    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

fn keygen(out_dir: &Path) -> CliResult<()> {
    fs::create_dir_all(out_dir)?;
    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);
    let sk = SigningKey::from_bytes(&sk_bytes);
    let address = Address::from_verifying_key(&sk.verifying_key());

    fs::write(out_dir.join("sk.hex"), hex::encode(sk_bytes))?;
    fs::write(out_dir.join("pk.hex"), address.to_hex())?;
    print_json(&json!({
        "address": address,
        "out_dir": out_dir.display().to_string(),
    }))
}

fn load_key(key: &KeyArgs) -> CliResult<SigningKey> {
    match (&key.sk_hex, &key.key_file) {
        (Some(sk_hex), _) => parse_sk_hex(sk_hex),
        (None, Some(path)) => parse_sk_hex(&fs::read_to_string(path)?),
        (None, None) => Err(CliError::invalid_arg("either --sk-hex or --key-file is required")),
    }
}

fn parse_sk_hex(sk_hex: &str) -> CliResult<SigningKey> {
    let bytes = hex::decode(sk_hex.trim())
        .map_err(|err| CliError::invalid_arg(format!("invalid sk-hex: {err}")))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CliError::invalid_arg("sk-hex must be 32 bytes (64 hex chars)"))?;
    Ok(SigningKey::from_bytes(&arr))
}

fn print_json<T: Serialize>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("altarian").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parse_sk_hex_checks_length() {
        assert!(parse_sk_hex(&"ab".repeat(32)).is_ok());
        assert_eq!(parse_sk_hex("abcd").unwrap_err().exit_code(), 2);
        assert_eq!(parse_sk_hex("zz").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn keygen_init_reward_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();

        run(cli(&["keygen", "--out-dir", keys.to_str().unwrap()])).unwrap();
        let admin = fs::read_to_string(keys.join("pk.hex")).unwrap();
        let config = dir.path().join("config.json");
        fs::write(
            &config,
            json!({
                "cap": 1000,
                "decimals": 0,
                "governance": { "mode": "sole_admin", "admin": admin, "reward_unit": 5 }
            })
            .to_string(),
        )
        .unwrap();
        run(cli(&["--state", state, "init", "--config", config.to_str().unwrap()])).unwrap();

        let key_file = keys.join("sk.hex");
        let student = "09".repeat(32);
        run(cli(&[
            "--state",
            state,
            "reward-unit",
            "--target",
            &student,
            "--reason",
            "attendance",
            "--key-file",
            key_file.to_str().unwrap(),
        ]))
        .unwrap();

        let store = Store::open(state).unwrap();
        let student: Address = student.parse().unwrap();
        assert_eq!(store.token().balance_of(&student), 5);
        assert_eq!(store.token().achievements_of(&student), ["attendance"]);
    }

    #[test]
    fn sign_only_then_apply_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();
        let sk_hex = "07".repeat(32);
        let admin = Address::from_verifying_key(&parse_sk_hex(&sk_hex).unwrap().verifying_key());
        let config = dir.path().join("config.json");
        fs::write(
            &config,
            json!({ "cap": 10, "governance": { "mode": "sole_admin", "admin": admin } }).to_string(),
        )
        .unwrap();
        run(cli(&["--state", state, "init", "--config", config.to_str().unwrap()])).unwrap();

        let envelope = dir.path().join("reward.json");
        let target = "09".repeat(32);
        run(cli(&[
            "--state",
            state,
            "reward",
            "--target",
            &target,
            "--amount",
            "3",
            "--sk-hex",
            &sk_hex,
            "--sign-only",
            envelope.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(Store::open(state).unwrap().token().total_supply(), 0);

        let apply = || run(cli(&["--state", state, "apply", envelope.to_str().unwrap()]));
        apply().unwrap();
        let err = apply().unwrap_err();
        assert!(matches!(err, CliError::Store(StoreError::DuplicateCall(_))));
        assert_eq!(err.exit_code(), 15);
        assert_eq!(
            Store::open(state).unwrap().token().total_supply(),
            3 * 10u128.pow(18)
        );
    }

    #[test]
    fn envelope_for_another_state_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sk_hex = "07".repeat(32);
        let admin = Address::from_verifying_key(&parse_sk_hex(&sk_hex).unwrap().verifying_key());
        let config = dir.path().join("config.json");
        fs::write(
            &config,
            json!({ "cap": 10, "governance": { "mode": "sole_admin", "admin": admin } }).to_string(),
        )
        .unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        for state in [&first, &second] {
            run(cli(&["--state", state.to_str().unwrap(), "init", "--config", config.to_str().unwrap()]))
                .unwrap();
        }

        let envelope = dir.path().join("reward.json");
        run(cli(&[
            "--state",
            first.to_str().unwrap(),
            "reward",
            "--target",
            &"09".repeat(32),
            "--amount",
            "3",
            "--sk-hex",
            &sk_hex,
            "--sign-only",
            envelope.to_str().unwrap(),
        ]))
        .unwrap();

        let err = run(cli(&["--state", second.to_str().unwrap(), "apply", envelope.to_str().unwrap()]))
            .unwrap_err();
        assert!(matches!(err, CliError::Store(StoreError::ForeignDeployment { .. })));
        assert_eq!(err.exit_code(), 14);
        assert_eq!(Store::open(&second).unwrap().token().total_supply(), 0);
        run(cli(&["--state", first.to_str().unwrap(), "apply", envelope.to_str().unwrap()])).unwrap();
    }

    #[test]
    fn rejected_call_maps_to_class_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();
        let admin = "01".repeat(32);
        let config = dir.path().join("config.json");
        fs::write(
            &config,
            json!({ "cap": 10, "governance": { "mode": "sole_admin", "admin": admin } }).to_string(),
        )
        .unwrap();
        run(cli(&["--state", state, "init", "--config", config.to_str().unwrap()])).unwrap();

        let err = run(cli(&[
            "--state",
            state,
            "reward",
            "--target",
            &"09".repeat(32),
            "--amount",
            "1",
            "--sk-hex",
            &"02".repeat(32),
        ]))
        .unwrap_err();
        assert_eq!(err.exit_code(), 10);
        assert_eq!(run(cli(&["--state", state, "tx", "0"])).unwrap_err().exit_code(), 21);
    }
}

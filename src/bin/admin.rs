use std::collections::VecDeque;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use view_proof_service::domain::{Asset, AssetId, ProofPayload, ZkProof};
use view_proof_service::infra::{PgProofStore, PgViewStore, ProofStore, ProofVerifier, ViewStore};
use view_proof_service::proofs::{ClaimVerifier, ProofStatsPersister, ProofStatsTracker};

fn print_help() {
    eprintln!(
        "\
view-proof-admin

USAGE:
  view-proof-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  seed-asset                      Create or overwrite an asset's view counter
  list-proofs                     List the newest stored proofs for an asset
  verify-proof                    Verify a ZK proof JSON file offline
  reconcile                       Snapshot current view counts as proofs

COMMON OPTIONS:
  --database-url <postgres_url>    (defaults to env DATABASE_URL)

seed-asset OPTIONS:
  --asset-id <id>                 (required)
  --views <n>                     (default: 0)

list-proofs OPTIONS:
  --asset-id <id>                 (required)
  --limit <n>                     (default: 10)

verify-proof OPTIONS:
  --file <path>                   (required) Proof JSON, bare or as a stored record
  --trusted-witnesses <a,b,...>   (defaults to env ZK_TRUSTED_WITNESSES)
  --onchain                       Print the on-chain form when valid

reconcile OPTIONS:
  --asset-id <id>                 (required, repeatable)
"
    );
}

fn take_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))
}

async fn connect(database_url: Option<String>) -> anyhow::Result<PgPool> {
    let database_url = require_database_url(database_url)?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    view_proof_service::migrations::run_postgres(&pool).await?;
    Ok(pool)
}

/// Accepts a bare proof, a stored record (`{ proof: ... }`) or a
/// `ProofResult` envelope.
fn extract_zk_proof(value: serde_json::Value) -> anyhow::Result<ZkProof> {
    let candidate = match value.get("proof") {
        Some(inner) if inner.is_object() => inner.clone(),
        _ => value,
    };
    match ProofPayload::from_json(candidate) {
        ProofPayload::Zk(proof) => Ok(*proof),
        ProofPayload::SimpleVerification(_) => {
            anyhow::bail!("file holds a simple verification, not a ZK proof")
        }
        ProofPayload::Opaque(_) => anyhow::bail!("file does not contain a recognizable ZK proof"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "migrate" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(take_value(&mut args, &arg)?),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            connect(database_url).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "seed-asset" => {
            let mut database_url: Option<String> = None;
            let mut asset_id: Option<String> = None;
            let mut views: u64 = 0;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(take_value(&mut args, &arg)?),
                    "--asset-id" => asset_id = Some(take_value(&mut args, &arg)?),
                    "--views" => views = take_value(&mut args, &arg)?.parse()?,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let asset_id =
                AssetId::new(asset_id.ok_or_else(|| anyhow::anyhow!("--asset-id is required"))?);
            let store = PgViewStore::new(connect(database_url).await?);

            let asset = match store.get_asset(&asset_id).await? {
                Some(existing) => existing.with_views(views),
                None => Asset::new(asset_id.clone()).with_views(views),
            };
            store.upsert_asset(&asset).await?;
            println!("ok: asset {asset_id} has {views} views");
            Ok(())
        }
        "list-proofs" => {
            let mut database_url: Option<String> = None;
            let mut asset_id: Option<String> = None;
            let mut limit: u32 = 10;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(take_value(&mut args, &arg)?),
                    "--asset-id" => asset_id = Some(take_value(&mut args, &arg)?),
                    "--limit" => limit = take_value(&mut args, &arg)?.parse()?,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let asset_id =
                AssetId::new(asset_id.ok_or_else(|| anyhow::anyhow!("--asset-id is required"))?);
            let store = PgProofStore::new(connect(database_url).await?);
            let proofs = store.list_recent_proofs(&asset_id, limit).await?;

            for record in &proofs {
                let kind = match &record.proof {
                    ProofPayload::Zk(_) => "zk",
                    ProofPayload::SimpleVerification(_) => "simple-verification",
                    ProofPayload::Opaque(_) => "opaque",
                };
                println!(
                    "{}\t{}\t{}\t{}",
                    record.timestamp.to_rfc3339(),
                    record.view_count,
                    kind,
                    record.id
                );
            }
            eprintln!("{} proof(s)", proofs.len());
            Ok(())
        }
        "verify-proof" => {
            let mut file: Option<String> = None;
            let mut trusted: Option<String> = std::env::var("ZK_TRUSTED_WITNESSES").ok();
            let mut onchain = false;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--file" => file = Some(take_value(&mut args, &arg)?),
                    "--trusted-witnesses" => trusted = Some(take_value(&mut args, &arg)?),
                    "--onchain" => onchain = true,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let file = file.ok_or_else(|| anyhow::anyhow!("--file is required"))?;
            let raw = std::fs::read_to_string(&file)?;
            let proof = extract_zk_proof(serde_json::from_str(&raw)?)?;

            let verifier = ClaimVerifier::from_witness_list(trusted.as_deref())
                .map_err(|e| anyhow::anyhow!("invalid trusted witnesses: {e}"))?;

            match verifier.check(&proof) {
                Ok(()) => {
                    let views = proof
                        .extracted_views()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!("ok: proof {} is valid (views: {views})", proof.identifier);
                    if onchain {
                        let transformed = verifier.transform_for_onchain(&proof);
                        println!("{}", serde_json::to_string_pretty(&transformed)?);
                    }
                    Ok(())
                }
                Err(reason) => anyhow::bail!("invalid proof: {reason}"),
            }
        }
        "reconcile" => {
            let mut database_url: Option<String> = None;
            let mut asset_ids: Vec<AssetId> = Vec::new();

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(take_value(&mut args, &arg)?),
                    "--asset-id" => asset_ids.push(AssetId::new(take_value(&mut args, &arg)?)),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            if asset_ids.is_empty() {
                anyhow::bail!("at least one --asset-id is required");
            }

            let pool = connect(database_url).await?;
            let views: Arc<dyn ViewStore> = Arc::new(PgViewStore::new(pool.clone()));
            let proofs: Arc<dyn ProofStore> = Arc::new(PgProofStore::new(pool));

            // Statistics live in the server process; mark the requested
            // assets so the persister considers them.
            let stats = Arc::new(ProofStatsTracker::new());
            for asset_id in &asset_ids {
                stats.record(asset_id, true);
            }

            let report = ProofStatsPersister::new(stats, views, proofs).run().await;
            println!(
                "ok: examined={} created={} skipped={} failed={}",
                report.examined, report.created, report.skipped, report.failed
            );
            if report.failed > 0 {
                anyhow::bail!("{} asset(s) failed to reconcile", report.failed);
            }
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}

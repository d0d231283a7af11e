use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};
use upf_pdr::config::Config;
use upf_pdr::pdr_engine::assemble_pdr;
use upf_pdr::pfcp::{MessageType, PfcpMessage, PfdManagementRequest, SessionRequest};
use upf_pdr::types::{PDR, SEID};

#[derive(Parser, Debug)]
#[command(name = "upf-pdr")]
#[command(about = "Builds dataplane PDRs from PFCP session requests", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Session Establishment or Modification Request
    #[arg(short, long)]
    message: PathBuf,

    /// PFD Management Request applied before the session request
    #[arg(long)]
    pfd: Vec<PathBuf>,

    /// Session identifier for the built rules
    #[arg(long)]
    seid: Option<u64>,
}

async fn read_message(path: &Path) -> Result<PfcpMessage> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    PfcpMessage::parse(Bytes::from(data))
        .with_context(|| format!("Invalid PFCP message in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)?;
    config.validate()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let mut registry = config.registry();
    info!("Loaded {} application PFDs from config", registry.len());

    for path in &args.pfd {
        let msg = read_message(path).await?;
        msg.expect_type(&[MessageType::PfdManagementRequest])?;
        let request = PfdManagementRequest::parse(msg.payload)
            .with_context(|| format!("Invalid PFD Management Request in {}", path.display()))?;
        registry.apply_pfd_management(&request.applications);
    }

    let msg = read_message(&args.message).await?;
    msg.expect_type(&[
        MessageType::SessionEstablishmentRequest,
        MessageType::SessionModificationRequest,
    ])?;
    let request = SessionRequest::parse(msg.payload.clone())
        .context("Invalid session request")?;

    let seid = args
        .seid
        .map(SEID)
        .or(msg.header.seid.filter(|seid| seid.0 != 0))
        .or(request.cp_fseid.as_ref().map(|fseid| fseid.seid))
        .unwrap_or_default();
    info!("Building {} PDRs for session {}", request.pdrs.len(), seid);

    let mut built: Vec<PDR> = Vec::new();
    let mut failed = 0;
    for element in &request.pdrs {
        match assemble_pdr(element, seid, &registry) {
            Ok(assembled) => {
                let cause = assembled.cause();
                match assembled.pdr {
                    Some(pdr) => built.push(pdr),
                    None => {
                        error!("PDR not built (cause {:?})", cause);
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                error!("{} (cause {:?})", e, e.cause());
                failed += 1;
            }
        }
    }

    print!("{}", serde_yaml::to_string(&built)?);

    if failed > 0 {
        anyhow::bail!("{} of {} PDRs could not be built", failed, request.pdrs.len());
    }
    Ok(())
}

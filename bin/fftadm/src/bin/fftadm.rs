// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

use std::io;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use slog::Drain;
use slog::Logger;
use slog::o;
use tabwriter::TabWriter;

use fft::api::API_VERSION;
use fft::api::AddFlowReq;
use fft::api::FlowKey;
use fft::api::MAJOR_VERSION;
use fft::api::ParamSet;
use fft::api::RemoveFlowsReq;
use fft::cfg::FftCfg;
use fft::print::print_flows;
use fft::print::print_params;
use fft::print::print_stats;
use fft::print::print_table_info;
use fftadm::FftAdm;
use fftadm::pcap::load_pcap;
use fftadm::replay::ReplayCfg;
use fftadm::replay::ReplaySummary;
use fftadm::replay::Replayer;

/// Administer a fast forwarding table.
///
/// The table is built from the configuration file, seeded by replaying
/// a packet capture if one is given, and then handed the command.
#[derive(Debug, Parser)]
#[command(version = fft_pkg_version())]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    replay: ReplayArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Replay this pcap file before running the command.
    #[arg(long)]
    pcap: Option<PathBuf>,

    /// Learn replayed flows with this egress port.
    #[arg(long)]
    learn: Option<u8>,

    /// Run replayed packets through the verification stage.
    #[arg(long)]
    verify: bool,

    /// Run replayed packets through the routing stage.
    #[arg(long)]
    route: bool,

    /// The flow timeout in milliseconds, overriding the configuration.
    #[arg(long)]
    timeout: Option<u32>,

    /// Stamp replayed packets with the current time rather than their
    /// capture time.
    #[arg(long)]
    restamp: bool,

    /// Log every packet each stage handles.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay the capture and summarize what the stages did.
    Replay,

    /// Replay the capture, then take the learning stage down and
    /// replay it again. Flows learned for the stage's port are
    /// forgotten, and the second pass learns nothing.
    AdminDown,

    /// Print the table's size and bucket occupancy.
    TableInfo,

    /// Dump the table's flow records.
    DumpFlows {
        /// Only dump records which have not expired.
        #[arg(long)]
        active: bool,
    },

    /// Dump the table's counters.
    DumpStats,

    /// Add a flow record by hand.
    AddFlow {
        /// The flow, as `<src>:<port> -> <dst>:<port>`.
        key: FlowKey,

        /// The egress port.
        #[arg(short)]
        port: u8,

        /// The gateway to rewrite the next hop to.
        #[arg(short)]
        gateway: Option<Ipv4Addr>,

        #[arg(short, default_value_t = 64)]
        ttl: u8,

        /// Keep an existing fresh record rather than replacing it.
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Remove every flow record for an egress port.
    RemoveFlows { port: RemoveFlowsReq },

    /// Remove every flow record.
    ClearTable,

    /// Remove every expired flow record.
    ManualGc,

    /// Print the table's parameters.
    GetParams,

    /// Set table parameters, each given as `<name>=<value>`.
    SetParams {
        #[arg(required = true)]
        params: Vec<ParamSet>,
    },
}

fn fft_pkg_version() -> String {
    format!("{MAJOR_VERSION}.{API_VERSION}")
}

fn root_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).ignore_res();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("component" => "fftadm"))
}

fn print_summary(sum: &ReplaySummary) -> io::Result<()> {
    let mut t = TabWriter::new(io::stdout());
    writeln!(t, "packets\t{}", sum.packets)?;
    writeln!(t, "no_flow\t{}", sum.no_flow)?;
    writeln!(t, "learned\t{}", sum.learned)?;
    writeln!(t, "matched\t{}", sum.matched)?;
    writeln!(t, "unmatched\t{}", sum.unmatched)?;
    for (port, n) in &sum.forwarded {
        writeln!(t, "port {port}\t{n}")?;
    }
    writeln!(t, "unrouted\t{}", sum.unrouted)?;
    writeln!(t, "dropped\t{}", sum.dropped)?;
    t.flush()
}

fn replay_cfg(cfg: &FftCfg, args: &ReplayArgs) -> ReplayCfg {
    let verbose = |v: bool| v || args.verbose;

    ReplayCfg {
        insert: args.learn.map(|port| {
            let mut c = cfg.insert;
            c.port = port;
            c.verbose = verbose(c.verbose);
            c
        }),
        verify: args.verify.then(|| {
            let mut c = cfg.verify;
            c.verbose = verbose(c.verbose);
            c
        }),
        route: args.route.then(|| {
            let mut c = cfg.route;
            c.verbose = verbose(c.verbose);
            c
        }),
        restamp: args.restamp,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log = root_logger();

    let mut cfg = match &cli.config {
        Some(path) => FftCfg::load(path)?,
        None => FftCfg::default(),
    };
    if let Some(ms) = cli.replay.timeout {
        cfg.table.timeout_ms = ms;
    }

    let hdl = FftAdm::new(cfg.table.build().into_shared());

    let mut replay = None;
    if let Some(path) = &cli.replay.pcap {
        let cap = load_pcap(path)
            .with_context(|| format!("loading {}", path.display()))?;
        let replayer = Replayer::new(
            hdl.table(),
            &replay_cfg(&cfg, &cli.replay),
            &log,
        );
        let sum = replayer.replay(cap.pkts.clone());
        replay = Some((replayer, cap, sum));
    }

    match cli.cmd {
        Command::Replay => match replay {
            Some((_, _, sum)) => print_summary(&sum)?,
            None => anyhow::bail!("replay requires --pcap"),
        },

        Command::AdminDown => {
            let Some((replayer, cap, _)) = replay else {
                anyhow::bail!("admin-down requires --pcap");
            };
            let Some(removed) = replayer.admin_down() else {
                anyhow::bail!("admin-down requires --learn");
            };
            println!("removed {removed}");
            print_summary(&replayer.replay(cap.pkts))?;
        }

        Command::TableInfo => print_table_info(&hdl.table_info()?)?,

        Command::DumpFlows { active } => {
            print_flows(&hdl.dump_flows(active)?)?;
        }

        Command::DumpStats => print_stats(&hdl.dump_stats()?)?,

        Command::AddFlow { key, port, gateway, ttl, no_overwrite } => {
            let overwrite = !no_overwrite;
            let req = AddFlowReq { key, gateway, port, ttl, overwrite };
            if !hdl.add_flow(&req)?.added {
                println!("fresh record for {key} kept");
            }
            print_flows(&hdl.dump_flows(false)?)?;
        }

        Command::RemoveFlows { port } => {
            println!("removed {}", hdl.remove_flows(&port)?.removed);
        }

        Command::ClearTable => {
            hdl.clear_table()?;
        }

        Command::ManualGc => {
            println!("removed {}", hdl.manual_gc()?.removed);
        }

        Command::GetParams => print_params(&hdl.get_params()?)?,

        Command::SetParams { params } => {
            print_params(&hdl.set_params(&params)?)?;
        }
    }

    Ok(())
}

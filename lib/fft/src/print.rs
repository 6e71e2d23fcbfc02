// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Print command responses in human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both fftadm and integration tests.

use crate::api::DumpFlowsResp;
use crate::api::FlowDumpEntry;
use crate::api::TableInfoResp;
use crate::api::TableParams;
use crate::api::TableStatsSnap;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a [`DumpFlowsResp`].
pub fn print_flows(resp: &DumpFlowsResp) -> std::io::Result<()> {
    print_flows_into(&mut std::io::stdout(), resp)
}

/// Print a [`DumpFlowsResp`].
pub fn print_flows_into(
    writer: &mut impl Write,
    resp: &DumpFlowsResp,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    if !resp.overwritten.is_empty() {
        writeln!(t, "Overwritten Flows")?;
        write_hr(&mut t)?;
        print_flow_header(&mut t)?;
        for e in &resp.overwritten {
            print_flow(&mut t, e)?;
        }
        writeln!(t)?;
        t.flush()?;
    }

    writeln!(t, "Flows")?;
    write_hr(&mut t)?;
    print_flow_header(&mut t)?;
    for e in &resp.flows {
        print_flow(&mut t, e)?;
    }
    t.flush()
}

fn print_flow_header(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "BUCKET\tFLOW\tPORT\tGATEWAY\tTTL\tAGE (ms)\tPKTS\tBYTES")
}

fn print_flow(t: &mut impl Write, e: &FlowDumpEntry) -> std::io::Result<()> {
    let gw = e.gateway.map(|gw| gw.to_string());
    let (pkts, bytes) = match e.stats {
        Some(s) => (s.packets.to_string(), s.bytes.to_string()),
        None => ("-".to_string(), "-".to_string()),
    };

    writeln!(
        t,
        "{:08x}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        e.bucket,
        e.key,
        e.port,
        gw.as_deref().unwrap_or("-"),
        e.ttl,
        e.age_ms,
        pkts,
        bytes,
    )
}

/// Print a [`TableInfoResp`].
pub fn print_table_info(info: &TableInfoResp) -> std::io::Result<()> {
    print_table_info_into(&mut std::io::stdout(), info)
}

/// Print a [`TableInfoResp`].
pub fn print_table_info_into(
    writer: &mut impl Write,
    info: &TableInfoResp,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "SIZE\tBUCKETS\tMAX BUCKET SIZE")?;
    writeln!(t, "{}\t{}\t{}", info.size, info.bucket_count, info.max_bucket_size)?;
    t.flush()
}

/// Print a [`TableStatsSnap`].
pub fn print_stats(stats: &TableStatsSnap) -> std::io::Result<()> {
    print_stats_into(&mut std::io::stdout(), stats)
}

/// Print a [`TableStatsSnap`].
pub fn print_stats_into(
    writer: &mut impl Write,
    stats: &TableStatsSnap,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "Table Stats")?;
    write_hrb(&mut t)?;
    writeln!(t, "insert\t{}", stats.insert)?;
    writeln!(t, "insert_fresh\t{}", stats.insert_fresh)?;
    writeln!(t, "verify_hit\t{}", stats.verify_hit)?;
    writeln!(t, "verify_miss\t{}", stats.verify_miss)?;
    writeln!(t, "route_hit\t{}", stats.route_hit)?;
    writeln!(t, "route_miss\t{}", stats.route_miss)?;
    writeln!(t, "gc_bucket\t{}", stats.gc_bucket)?;
    writeln!(t, "gc_global\t{}", stats.gc_global)?;
    writeln!(t, "port_removed\t{}", stats.port_removed)?;
    t.flush()
}

/// Print a [`TableParams`].
pub fn print_params(params: &TableParams) -> std::io::Result<()> {
    print_params_into(&mut std::io::stdout(), params)
}

/// Print a [`TableParams`].
pub fn print_params_into(
    writer: &mut impl Write,
    params: &TableParams,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "timeout\t{}", params.timeout_ms)?;
    writeln!(t, "loop_avoidance\t{}", params.loop_avoidance)?;
    writeln!(t, "gc_on_add\t{}", params.gc_on_add)?;
    writeln!(t, "gc_on_check\t{}", params.gc_on_check)?;
    t.flush()
}

/// Print horizontal rule in bold.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Print horizontal rule.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

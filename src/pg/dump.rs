//! The block-by-block formatting engine.
//!
//! Drives a [`RelFile`] through header, item, and special-section formatting
//! in the fixed order every block follows on disk. All output goes through
//! the supplied writer; structural anomalies print inline and mark the scan
//! failed without stopping it — partial output from a damaged file beats an
//! early abort.
//!
//! The same engine runs the TOAST side-relation scan: when a
//! [`ToastCollector`] is supplied, NORMAL items are consumed as chunk tuples
//! instead of being decoded, and per-block output is suppressed unless
//! verbose output was requested.

use std::io::Write;
use std::path::PathBuf;

use crate::pg::checksum;
use crate::pg::constants::*;
use crate::pg::copyline::CopyLine;
use crate::pg::decode::{self, AttrType};
use crate::pg::page::{is_btree_meta_page, BtreeMeta, ItemId, PageHeader};
use crate::pg::relfile::{Block, RelFile};
use crate::pg::special::{
    classify, BtreeSpecial, GinSpecial, GistSpecial, HashSpecial, SpGistSpecial, SpecialKind,
};
use crate::pg::toast::{self, ChunkOutcome, ToastCollector};
use crate::pg::tuple::{
    decode_posting_array, decode_posting_segment, HeapTuple, IndexTuple, ItemFormat,
    SpGistInnerTuple, SpGistLeafTuple,
};
use crate::util::hex::format_binary;
use crate::{wprint, wprintln, PgfdError};

/// User-forced item interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedFormat {
    Heap,
    Index,
}

/// Immutable configuration for one dump run.
///
/// Replaces option bitmasks with one value passed into every component; the
/// TOAST side scan derives its own restricted copy via
/// [`for_toast_scan`](Self::for_toast_scan) instead of sharing mutable
/// state with the outer scan.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// File being dumped; TOAST side relations resolve relative to it.
    pub file: PathBuf,
    /// Show absolute file addresses in hex dumps.
    pub absolute_addressing: bool,
    /// Stream raw block images instead of formatting.
    pub binary_dump: bool,
    /// Hex+ascii dump only, no interpretation.
    pub no_interpret: bool,
    /// Hex+ascii dumps alongside the interpreted output.
    pub format_binary: bool,
    /// Interpreted per-item detail.
    pub item_detail: bool,
    /// Verify block checksums.
    pub verify_checksums: bool,
    /// Type list for tuple decoding; `None` disables decoding.
    pub decode_types: Option<Vec<AttrType>>,
    /// Reconstruct TOASTed values from the side relation.
    pub decode_toast: bool,
    /// Report tuples deleted by a nonzero xmax instead of decoding them.
    pub ignore_old: bool,
    /// Inclusive block range to dump.
    pub range: Option<(u32, u32)>,
    /// Forced block size; auto-detected from block 0 when `None`.
    pub block_size: Option<u32>,
    /// Segment size in bytes, for checksum block offsets.
    pub segment_size: u32,
    /// Forced segment number; derived from the file name when `None`.
    pub segment_number: Option<u32>,
    /// Force heap or index interpretation of items.
    pub format_override: Option<ForcedFormat>,
    /// Show TOAST scan detail.
    pub verbose: bool,
}

impl DumpConfig {
    pub fn new(file: PathBuf) -> Self {
        DumpConfig {
            file,
            absolute_addressing: false,
            binary_dump: false,
            no_interpret: false,
            format_binary: false,
            item_detail: false,
            verify_checksums: false,
            decode_types: None,
            decode_toast: false,
            ignore_old: false,
            range: None,
            block_size: None,
            segment_size: RELSEG_SIZE * BLCKSZ_DEFAULT,
            segment_number: None,
            format_override: None,
            verbose: false,
        }
    }

    /// Restricted configuration for the recursive TOAST side scan: plain
    /// sequential formatting of the side relation, nothing else.
    pub fn for_toast_scan(&self, toast_file: PathBuf) -> Self {
        DumpConfig {
            verbose: self.verbose,
            ..DumpConfig::new(toast_file)
        }
    }
}

/// Mutable state threaded through one scan.
///
/// Holds the failure flag that turns into the process exit status and the
/// reusable output-row accumulator. The TOAST side scan gets its own value,
/// so the outer accumulator survives the recursion untouched.
pub struct ScanState {
    /// Any structural anomaly was reported during this scan.
    pub failed: bool,
    /// Reusable accumulator for decoded rows.
    pub copy: CopyLine,
    /// This scan reads a TOAST side relation.
    pub is_toast: bool,
}

impl ScanState {
    pub fn new(is_toast: bool) -> Self {
        ScanState {
            failed: false,
            copy: CopyLine::new(),
            is_toast,
        }
    }

    /// Whether per-block output should be shown for this scan.
    fn show(&self, cfg: &DumpConfig) -> bool {
        !self.is_toast || cfg.verbose
    }

    fn indent(&self) -> &'static str {
        if self.is_toast {
            "\t"
        } else {
            ""
        }
    }
}

/// Iterate blocks and format each one.
///
/// With a [`ToastCollector`], NORMAL items are treated as TOAST chunk tuples
/// and the scan stops as soon as the collector is complete.
pub fn dump_file_contents(
    cfg: &DumpConfig,
    rel: &mut RelFile,
    scan: &mut ScanState,
    writer: &mut dyn Write,
    mut toast: Option<&mut ToastCollector>,
) -> Result<(), PgfdError> {
    if let Some(n) = cfg.segment_number {
        rel.set_segment_number(n);
    }
    if let Some((start, _)) = cfg.range {
        rel.seek_to_block(start)?;
    }

    let mut first_read = true;
    let mut last_block: Option<u32> = None;

    loop {
        let block = match rel.read_block()? {
            Some(block) => block,
            None => {
                if first_read {
                    scan.failed = true;
                    wprintln!(writer, "Error: Premature end of file encountered.")?;
                } else if !cfg.binary_dump && scan.show(cfg) {
                    wprintln!(
                        writer,
                        "\n*** End of File Encountered. Last Block Read: {} ***",
                        last_block.map(|b| b as i64).unwrap_or(-1)
                    )?;
                }
                break;
            }
        };
        first_read = false;
        last_block = Some(block.number);

        if cfg.binary_dump {
            writer
                .write_all(&block.data[..block.bytes_read])
                .map_err(|e| PgfdError::Io(e.to_string()))?;
        } else {
            format_block(cfg, scan, &block, rel, writer, toast.as_deref_mut())?;
        }

        if let Some(collector) = toast.as_deref_mut() {
            if collector.is_complete() {
                break;
            }
        }

        if let Some((_, end)) = cfg.range {
            if block.number >= end {
                if !cfg.binary_dump && scan.show(cfg) {
                    wprintln!(
                        writer,
                        "\n*** End of Requested Range Encountered. Last Block Read: {} ***",
                        block.number
                    )?;
                }
                break;
            }
        }
    }

    Ok(())
}

/// Format one block: banner, header, items, special section.
pub fn format_block(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    block: &Block,
    rel: &RelFile,
    writer: &mut dyn Write,
    toast: Option<&mut ToastCollector>,
) -> Result<(), PgfdError> {
    let block_size = rel.block_size();
    let ind = scan.indent();

    if scan.show(cfg) {
        wprintln!(
            writer,
            "\n{}Block {:4} **{}***************************************",
            ind,
            block.number,
            if block.is_full() {
                "***************"
            } else {
                " PARTIAL BLOCK "
            }
        )?;
    }

    if cfg.no_interpret {
        let base = cfg.absolute_addressing.then_some(block.offset);
        wprint!(writer, "{}", format_binary(&block.data, 0, block.bytes_read, base))?;
        return Ok(());
    }

    let Some((header, _)) = format_header(cfg, scan, block, block_size, rel, writer)? else {
        // Ran out of block inside the header; raw bytes were already shown
        // when requested. Nothing else is decodable.
        return Ok(());
    };

    let kind = classify(&block.data, &header, block_size, block.bytes_read);

    format_item_block(cfg, scan, block, &header, kind, block_size, writer, toast)?;

    if kind != SpecialKind::None {
        format_special(cfg, scan, block, &header, kind, block_size, writer)?;
    }

    Ok(())
}

/// Format the page header, returning `None` when the block ends inside the
/// header or its item array.
#[allow(clippy::type_complexity)]
fn format_header(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    block: &Block,
    block_size: u32,
    rel: &RelFile,
    writer: &mut dyn Write,
) -> Result<Option<(PageHeader, usize)>, PgfdError> {
    let ind = scan.indent();
    let show = scan.show(cfg);

    if show {
        wprintln!(writer, "{}<Header> -----", ind)?;
    }

    let mut eof = false;
    let mut header_bytes = block.bytes_read.min(SIZE_PAGE_HEADER);
    let parsed = PageHeader::parse(&block.data[..block.bytes_read]);

    if let Some(header) = &parsed {
        header_bytes = SIZE_PAGE_HEADER;
        let max_offset = header.max_offset();
        if max_offset > 0 {
            let items_length = max_offset as usize * SIZE_ITEM_ID;
            if block.bytes_read < SIZE_PAGE_HEADER + items_length {
                header_bytes = block.bytes_read;
                eof = true;
            } else {
                header_bytes += items_length;
            }
        }

        // The fixed header is intact, so its fields (and the sanity and
        // checksum checks) are still worth showing even when the item array
        // runs past the end of the read.
        {
            if show {
                wprintln!(
                    writer,
                    "{} Block Offset: 0x{:08x}         Offsets: Lower    {:4} (0x{:04x})",
                    ind, block.offset, header.lower, header.lower
                )?;
                wprintln!(
                    writer,
                    "{} Block: Size {:4}  Version {:4}            Upper    {:4} (0x{:04x})",
                    ind,
                    header.page_size(),
                    header.layout_version(),
                    header.upper,
                    header.upper
                )?;
                wprintln!(
                    writer,
                    "{} LSN:  logid {:6} recoff 0x{:08x}      Special  {:4} (0x{:04x})",
                    ind, header.lsn_logid, header.lsn_recoff, header.special, header.special
                )?;
                wprintln!(
                    writer,
                    "{} Items: {:4}                      Free Space: {:4}",
                    ind,
                    max_offset,
                    header.upper.saturating_sub(header.lower)
                )?;
                wprintln!(
                    writer,
                    "{} Checksum: 0x{:04x}  Prune XID: 0x{:08x}  Flags: 0x{:04x} ({})",
                    ind, header.checksum, header.prune_xid, header.flags,
                    header.flag_names()
                )?;
                wprintln!(
                    writer,
                    "{} Length (including item array): {}\n",
                    ind, header_bytes
                )?;
            }

            if is_btree_meta_page(&block.data, header, block_size, block.bytes_read) {
                if let Some(meta) = BtreeMeta::parse(&block.data) {
                    if show {
                        wprintln!(
                            writer,
                            "{} BTree Meta Data:  Magic (0x{:08x})   Version ({})",
                            ind, meta.magic, meta.version
                        )?;
                        wprintln!(
                            writer,
                            "{}                   Root:     Block ({})  Level ({})",
                            ind, meta.root, meta.level
                        )?;
                        wprintln!(
                            writer,
                            "{}                   FastRoot: Block ({})  Level ({})\n",
                            ind, meta.fastroot, meta.fastlevel
                        )?;
                    }
                    header_bytes += SIZE_BTREE_META;
                }
            }

            if !header.is_sane(block_size) {
                scan.failed = true;
                wprintln!(writer, " Error: Invalid header information.\n")?;
            }

            if cfg.verify_checksums && block.is_full() {
                let delta = (cfg.segment_size / block_size) * rel.segment_number();
                if let Some(result) =
                    checksum::verify_page(&block.data, block.number, delta)
                {
                    if !result.is_valid() {
                        scan.failed = true;
                        wprintln!(
                            writer,
                            " Error: checksum failure: calculated 0x{:04x}.\n",
                            result.calculated
                        )?;
                    }
                }
            }
        }
    } else {
        eof = true;
    }

    if eof {
        scan.failed = true;
        if show {
            wprintln!(
                writer,
                "{} Error: End of block encountered within the header. Bytes read: {:4}.\n",
                ind, block.bytes_read
            )?;
        }
    }

    if cfg.format_binary {
        let base = cfg.absolute_addressing.then_some(block.offset);
        wprint!(writer, "{}", format_binary(&block.data, 0, header_bytes, base))?;
    }

    if eof {
        return Ok(None);
    }
    Ok(parsed.map(|h| (h, header_bytes)))
}

/// Select the item interpretation for a block.
fn select_format(
    cfg: &DumpConfig,
    data: &[u8],
    header: &PageHeader,
    kind: SpecialKind,
) -> ItemFormat {
    match cfg.format_override {
        Some(ForcedFormat::Index) => return ItemFormat::Index,
        Some(ForcedFormat::Heap) => return ItemFormat::Heap,
        None => {}
    }
    match kind {
        SpecialKind::Btree | SpecialKind::Hash | SpecialKind::Gist => ItemFormat::Index,
        SpecialKind::Gin => match GinSpecial::parse(data, header.special as usize) {
            Some(gin) if gin.flags & GIN_DATA != 0 && gin.flags & GIN_LEAF != 0 => {
                ItemFormat::GinPosting {
                    compressed: gin.flags & GIN_COMPRESSED != 0,
                }
            }
            _ => ItemFormat::Index,
        },
        SpecialKind::SpGist => match SpGistSpecial::parse(data, header.special as usize) {
            Some(spgist) if spgist.is_leaf() => ItemFormat::SpGistLeaf,
            Some(_) => ItemFormat::SpGistInner,
            None => ItemFormat::Heap,
        },
        _ => ItemFormat::Heap,
    }
}

/// Format the items referenced by the block's item array.
#[allow(clippy::too_many_arguments)]
fn format_item_block(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    block: &Block,
    header: &PageHeader,
    kind: SpecialKind,
    block_size: u32,
    writer: &mut dyn Write,
    mut toast: Option<&mut ToastCollector>,
) -> Result<(), PgfdError> {
    let ind = scan.indent();
    let show = scan.show(cfg);

    // On a meta page the meta block sits where items would normally be;
    // walking it as items prints garbage.
    if is_btree_meta_page(&block.data, header, block_size, block.bytes_read) {
        return Ok(());
    }

    if show {
        wprintln!(writer, "{}<Data> -----", ind)?;
    }

    let max_offset = header.max_offset();
    if max_offset == 0 {
        if show {
            wprintln!(writer, "{} Empty block - no items listed \n", ind)?;
        }
        return Ok(());
    }
    if max_offset < 0 || max_offset > block_size as i32 {
        scan.failed = true;
        if show {
            wprintln!(
                writer,
                "{} Error: Item index corrupt on block. Offset: <{}>.\n",
                ind, max_offset
            )?;
        }
        return Ok(());
    }

    let format = select_format(cfg, &block.data, header, kind);

    for x in 1..=max_offset as usize {
        let Some(item) = ItemId::parse(&block.data, x) else {
            break;
        };
        let item_offset = item.offset as usize;
        let item_length = item.length as usize;

        if show {
            wprintln!(
                writer,
                "{} Item {:3} -- Length: {:4}  Offset: {:4} (0x{:04x})  Flags: {}",
                ind,
                x,
                item_length,
                item_offset,
                item_offset,
                item.flag_name()
            )?;
        }

        if item_offset + item_length > block_size as usize
            || item_offset + item_length > block.bytes_read
        {
            scan.failed = true;
            if show {
                wprintln!(
                    writer,
                    "{}  Error: Item contents extend beyond block.\n{}         BlockSize<{}> Bytes Read<{}> Item Start<{}>.",
                    ind,
                    ind,
                    block_size,
                    block.bytes_read,
                    item_offset + item_length
                )?;
            }
            continue;
        }

        let item_data = &block.data[item_offset..item_offset + item_length];

        if cfg.item_detail {
            format_item(cfg, scan, block, item_data, item_offset, format, writer)?;
        }

        if cfg.format_binary {
            let base = cfg.absolute_addressing.then_some(block.offset);
            wprint!(
                writer,
                "{}",
                format_binary(&block.data, item_offset, item_length, base)
            )?;
        }

        // Tuples removed by a committed delete can be skipped on request.
        let old_xmax = if cfg.ignore_old && item_length >= SIZE_HEAP_TUPLE_HEADER {
            HeapTuple::parse(item_data).map(|t| t.xmax).filter(|&x| x != 0)
        } else {
            None
        };

        if let Some(xmax) = old_xmax {
            if show {
                wprintln!(writer, "{}tuple was removed by transaction #{}", ind, xmax)?;
            }
        } else if let Some(collector) = toast.as_deref_mut() {
            if item.flags == LP_NORMAL {
                match toast::chunk_decode(item_data, collector) {
                    Ok(ChunkOutcome::Collected { seq, size }) => {
                        if show {
                            wprintln!(
                                writer,
                                "{}  Read TOAST chunk. TOAST Oid: {}, chunk id: {}, chunk data size: {}",
                                ind, collector.value_id, seq, size
                            )?;
                        }
                        if collector.is_complete() {
                            break;
                        }
                    }
                    Ok(ChunkOutcome::OtherValue) => {}
                    Err(e) => {
                        scan.failed = true;
                        wprintln!(writer, "{}  Error: {}.", ind, e)?;
                    }
                }
            }
        } else if cfg.decode_types.is_some() && item.flags == LP_NORMAL {
            decode::decode_tuple(cfg, scan, item_data, writer)?;
        }
    }
    if show {
        wprintln!(writer)?;
    }

    Ok(())
}

/// Interpret one item's contents according to the selected format.
fn format_item(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    block: &Block,
    item_data: &[u8],
    item_offset: usize,
    format: ItemFormat,
    writer: &mut dyn Write,
) -> Result<(), PgfdError> {
    let num_bytes = item_data.len();

    match format {
        ItemFormat::Index => {
            if num_bytes < IndexTuple::MIN_SIZE {
                if num_bytes != 0 {
                    scan.failed = true;
                    wprintln!(writer, "  Error: This item does not look like an index item.")?;
                }
                return Ok(());
            }
            let Some(tup) = IndexTuple::parse(item_data) else {
                scan.failed = true;
                return wprintln!(writer, "  Error: This item does not look like an index item.");
            };
            wprintln!(
                writer,
                "  Block Id: {}  linp Index: {}  Size: {}\n  Has Nulls: {}  Has Varwidths: {}\n",
                tup.tid.block,
                tup.tid.posid,
                tup.size(),
                tup.has_nulls() as u8,
                tup.has_varwidths() as u8
            )?;
            if num_bytes != tup.size() {
                scan.failed = true;
                wprintln!(
                    writer,
                    "  Error: Item size difference. Given <{}>, Internal <{}>.",
                    num_bytes,
                    tup.size()
                )?;
            }
        }

        ItemFormat::SpGistInner => {
            if num_bytes < SpGistInnerTuple::MIN_SIZE {
                if num_bytes != 0 {
                    scan.failed = true;
                    wprintln!(writer, "  Error: This item does not look like an SPGiST item.")?;
                }
                return Ok(());
            }
            let Some(tup) = SpGistInnerTuple::parse(item_data) else {
                return Ok(());
            };
            wprintln!(
                writer,
                "  State: {}  allTheSame: {} nNodes: {} prefixSize: {}\n",
                tup.state_name(),
                tup.all_the_same as u8,
                tup.n_nodes,
                tup.prefix_size
            )?;
            if num_bytes != tup.size as usize {
                scan.failed = true;
                wprintln!(
                    writer,
                    "  Error: Item size difference. Given <{}>, Internal <{}>.",
                    num_bytes, tup.size
                )?;
            } else if tup.prefix_size as usize == maxalign(tup.prefix_size as usize) {
                if cfg.format_binary && SGIT_HDR_SIZE + tup.prefix_size as usize <= num_bytes {
                    let base = cfg.absolute_addressing.then_some(block.offset);
                    wprint!(
                        writer,
                        "{}",
                        format_binary(
                            &block.data,
                            item_offset,
                            SGIT_HDR_SIZE + tup.prefix_size as usize,
                            base
                        )
                    )?;
                }
                let mut node_lines: Vec<String> = Vec::new();
                tup.for_each_node(item_data, |i, _off, node| {
                    node_lines.push(format!(
                        "  Node {:2}:  Downlink: {}/{}  Size: {}  Null: {}",
                        i,
                        node.tid.block,
                        node.tid.posid,
                        node.size(),
                        node.has_nulls() as u8
                    ));
                });
                for line in node_lines {
                    wprintln!(writer, "{}", line)?;
                }
            }
            wprintln!(writer)?;
        }

        ItemFormat::SpGistLeaf => {
            if num_bytes < SpGistLeafTuple::MIN_SIZE {
                if num_bytes != 0 {
                    scan.failed = true;
                    wprintln!(writer, "  Error: This item does not look like an SPGiST item.")?;
                }
                return Ok(());
            }
            let Some(tup) = SpGistLeafTuple::parse(item_data) else {
                return Ok(());
            };
            wprintln!(
                writer,
                "  State: {}  nextOffset: {}  Block Id: {}  linp Index: {}\n",
                tup.state_name(),
                tup.next_offset,
                tup.heap_ptr.block,
                tup.heap_ptr.posid
            )?;
            if num_bytes != tup.size as usize {
                scan.failed = true;
                wprintln!(
                    writer,
                    "  Error: Item size difference. Given <{}>, Internal <{}>.",
                    num_bytes, tup.size
                )?;
            }
        }

        ItemFormat::GinPosting { compressed } => {
            format_gin_postings(scan, item_data, compressed, writer)?;
        }

        ItemFormat::Heap => {
            if num_bytes < HeapTuple::MIN_SIZE {
                if num_bytes != 0 {
                    scan.failed = true;
                    wprintln!(writer, "  Error: This item does not look like a heap item.")?;
                }
                return Ok(());
            }
            let Some(tup) = HeapTuple::parse(item_data) else {
                return Ok(());
            };
            wprintln!(
                writer,
                "  XMIN: {}  XMAX: {}  CID|XVAC: {}",
                tup.xmin, tup.xmax, tup.field3
            )?;
            wprintln!(
                writer,
                "  Block Id: {}  linp Index: {}   Attributes: {}   Size: {}",
                tup.ctid.block,
                tup.ctid.posid,
                tup.natts(),
                tup.hoff
            )?;
            wprintln!(
                writer,
                "  infomask: 0x{:04x} ({}) ",
                tup.infomask,
                tup.flag_names()
            )?;

            let computed = tup.computed_hoff();
            if computed != tup.hoff as usize {
                scan.failed = true;
                wprintln!(
                    writer,
                    "  Error: Computed header length not equal to header size.\n         Computed <{}>  Header: <{}>",
                    computed, tup.hoff
                )?;
            } else if tup.has_nulls() && !tup.bits.is_empty() {
                wprint!(writer, "  t_bits: ")?;
                for (i, byte) in tup.bits.iter().enumerate() {
                    wprint!(writer, "[{}]: 0x{:02x} ", i, byte)?;
                    if i & 0x03 == 0x03 && i < tup.bits.len() - 1 {
                        wprint!(writer, "\n          ")?;
                    }
                }
                wprintln!(writer)?;
            }
            wprintln!(writer)?;
        }
    }

    Ok(())
}

/// Dump a GIN data-leaf item as posting entries.
fn format_gin_postings(
    scan: &mut ScanState,
    item_data: &[u8],
    compressed: bool,
    writer: &mut dyn Write,
) -> Result<(), PgfdError> {
    if compressed {
        let mut offset = 0;
        while offset + SIZE_ITEM_POINTER + 2 <= item_data.len() {
            let Some(segment) = decode_posting_segment(&item_data[offset..]) else {
                scan.failed = true;
                wprintln!(writer, "  Error: Posting list segment truncated.")?;
                break;
            };
            wprintln!(
                writer,
                "  Posting list segment: {} entries, {} bytes",
                segment.pointers.len(),
                segment.consumed
            )?;
            for ptr in &segment.pointers {
                wprintln!(writer, "   Posting: {}/{}", ptr.block, ptr.posid)?;
            }
            offset += segment.consumed;
        }
    } else {
        let pointers = decode_posting_array(item_data);
        wprintln!(writer, "  Postings: {} entries", pointers.len())?;
        for ptr in &pointers {
            wprintln!(writer, "   Posting: {}/{}", ptr.block, ptr.posid)?;
        }
    }
    wprintln!(writer)?;
    Ok(())
}

/// Format the special section according to its classified kind.
fn format_special(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    block: &Block,
    header: &PageHeader,
    kind: SpecialKind,
    block_size: u32,
    writer: &mut dyn Write,
) -> Result<(), PgfdError> {
    let show = scan.show(cfg);
    if !show {
        return Ok(());
    }

    let special = header.special as usize;
    let special_size = (block_size as usize).saturating_sub(special);

    wprintln!(writer, "<Special Section> -----")?;

    match kind {
        SpecialKind::Unknown | SpecialKind::ErrorBoundary => {
            scan.failed = true;
            wprintln!(writer, " Error: Invalid special section encountered.")?;
        }

        SpecialKind::Sequence => {
            wprintln!(writer, " Sequence: 0x{:08x}", SEQUENCE_MAGIC)?;
        }

        SpecialKind::Btree => {
            if let Some(section) = BtreeSpecial::parse(&block.data, special) {
                wprintln!(
                    writer,
                    " BTree Index Section:\n  Flags: 0x{:04x} ({})\n  Blocks: Previous ({})  Next ({})  {} ({})  CycleId ({})\n",
                    section.flags,
                    section.flag_names(),
                    section.prev,
                    section.next,
                    if section.is_deleted() { "Next XID" } else { "Level" },
                    section.level_or_xact,
                    section.cycle_id
                )?;
            }
        }

        SpecialKind::Hash => {
            if let Some(section) = HashSpecial::parse(&block.data, special) {
                wprintln!(
                    writer,
                    " Hash Index Section:\n  Flags: 0x{:04x} ({})\n  Bucket Number: 0x{:04x}\n  Blocks: Previous ({})  Next ({})\n",
                    section.flags,
                    section.flag_names(),
                    section.bucket,
                    section.prev_blkno,
                    section.next_blkno
                )?;
            }
        }

        SpecialKind::Gist => {
            if let Some(section) = GistSpecial::parse(&block.data, special) {
                wprintln!(
                    writer,
                    " GIST Index Section:\n  NSN: 0x{:08x}/0x{:08x}\n  RightLink: {}\n  Flags: 0x{:08x} ({})\n",
                    section.nsn_logid,
                    section.nsn_recoff,
                    section.rightlink,
                    section.flags,
                    section.flag_names()
                )?;
            }
        }

        SpecialKind::Gin => {
            if let Some(section) = GinSpecial::parse(&block.data, special) {
                wprintln!(
                    writer,
                    " GIN Index Section:\n  Flags: 0x{:08x} ({})  Maxoff: {}\n  Blocks: RightLink ({})\n",
                    section.flags,
                    section.flag_names(),
                    section.maxoff,
                    section.rightlink as i64
                )?;
            }
        }

        SpecialKind::SpGist => {
            if let Some(section) = SpGistSpecial::parse(&block.data, special) {
                wprintln!(
                    writer,
                    " SPGIST Index Section:\n  Flags: 0x{:08x} ({})\n  nRedirection: {}\n  nPlaceholder: {}\n",
                    section.flags,
                    section.flag_names(),
                    section.n_redirection,
                    section.n_placeholder
                )?;
            }
        }

        SpecialKind::None => {}
    }

    if cfg.format_binary {
        if kind == SpecialKind::ErrorBoundary {
            scan.failed = true;
            wprintln!(
                writer,
                " Error: Special section points off page. Unable to dump contents."
            )?;
        } else {
            let base = cfg.absolute_addressing.then_some(block.offset);
            wprint!(
                writer,
                "{}",
                format_binary(&block.data, special, special_size, base)
            )?;
        }
    }

    Ok(())
}

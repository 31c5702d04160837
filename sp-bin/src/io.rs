//! Parsing of the block, net and alignment input files and emission of the
//! results, plot and solution files.

use sp_types::*;
use stackplan::{Config, DieStack, Error, FinalReport, Result};
use std::path::Path;

fn input_error(path: &Path, line: usize, msg: impl Into<String>) -> Error {
    Error::Input {
        path: path.to_path_buf(),
        line,
        msg: msg.into(),
    }
}

/// Non-empty, non-comment lines with their 1-based line numbers.
fn data_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

/// `<id> <w> <h>` per line, dimensions positive.
pub fn parse_blocks(path: &Path) -> Result<BlockSet> {
    let raw = std::fs::read_to_string(path)?;
    let mut blocks = BlockSet::new();
    for (lineno, line) in data_lines(&raw) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[id, w, h] = fields.as_slice() else {
            return Err(input_error(path, lineno, "expected `<id> <w> <h>`"));
        };
        let w: f64 = w
            .parse()
            .map_err(|_| input_error(path, lineno, format!("bad width `{w}`")))?;
        let h: f64 = h
            .parse()
            .map_err(|_| input_error(path, lineno, format!("bad height `{h}`")))?;
        if w <= 0.0 || h <= 0.0 {
            return Err(input_error(
                path,
                lineno,
                format!("dimensions must be positive, got {w} x {h}"),
            ));
        }
        if blocks.insert(Block::new(id, w, h)).is_none() {
            return Err(input_error(path, lineno, format!("duplicate block `{id}`")));
        }
    }
    Ok(blocks)
}

/// `<id> <intra|inter> <block_id>...` per line.
pub fn parse_nets(path: &Path, blocks: &BlockSet) -> Result<Vec<Net>> {
    let raw = std::fs::read_to_string(path)?;
    let mut nets = Vec::new();
    for (lineno, line) in data_lines(&raw) {
        let mut fields = line.split_whitespace();
        let (Some(id), Some(kind)) = (fields.next(), fields.next()) else {
            return Err(input_error(path, lineno, "expected `<id> <type> <block>...`"));
        };
        let kind: NetKind = kind
            .parse()
            .map_err(|e| input_error(path, lineno, e))?;
        let members = fields
            .map(|name| {
                blocks
                    .lookup(name)
                    .ok_or_else(|| input_error(path, lineno, format!("unknown block `{name}`")))
            })
            .collect::<Result<Vec<BlockId>>>()?;
        if members.is_empty() {
            return Err(input_error(path, lineno, format!("net `{id}` has no blocks")));
        }
        nets.push(Net::new(id, kind, members));
    }
    Ok(nets)
}

/// `<id_i> <id_j> <kind_x> <val_x> <kind_y> <val_y>` per line.
pub fn parse_alignments(path: &Path, blocks: &BlockSet) -> Result<Vec<AlignmentReq>> {
    let raw = std::fs::read_to_string(path)?;
    let mut reqs = Vec::new();
    for (lineno, line) in data_lines(&raw) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[id_i, id_j, kind_x, val_x, kind_y, val_y] = fields.as_slice() else {
            return Err(input_error(
                path,
                lineno,
                "expected `<id_i> <id_j> <kind_x> <val_x> <kind_y> <val_y>`",
            ));
        };
        let block = |name: &str| {
            blocks
                .lookup(name)
                .ok_or_else(|| input_error(path, lineno, format!("unknown block `{name}`")))
        };
        let kind = |s: &str| {
            s.parse::<AlignKind>()
                .map_err(|e| input_error(path, lineno, e))
        };
        let value = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| input_error(path, lineno, format!("bad value `{s}`")))
        };
        reqs.push(AlignmentReq::new(
            block(id_i)?,
            block(id_j)?,
            kind(kind_x)?,
            value(val_x)?,
            kind(kind_y)?,
            value(val_y)?,
        ));
    }
    Ok(reqs)
}

pub fn write_results(benchmark: &str, report: &FinalReport) -> Result<()> {
    std::fs::write(format!("{benchmark}.results"), format!("{report}\n"))?;
    Ok(())
}

/// One gnuplot script per die, drawing each placed block as a labelled
/// rectangle inside the fixed outline.
pub fn write_plots(
    benchmark: &str,
    config: &Config,
    stack: &DieStack,
    blocks: &BlockSet,
) -> Result<()> {
    for die in &stack.dies {
        let mut plot = String::new();
        plot.push_str(&format!(
            "set title \"{benchmark} - die {}\"\n\
             set xrange [0:{}]\n\
             set yrange [0:{}]\n\
             set size ratio {}\n",
            die.id,
            config.outline_x,
            config.outline_y,
            config.outline_y / config.outline_x,
        ));
        for i in 0..die.cbl.len() {
            let b = &blocks[die.cbl.block(i)];
            plot.push_str(&format!(
                "set object {n} rect from {},{} to {},{} fillstyle empty border 1\n\
                 set label {n} \"{}\" at {},{} center\n",
                b.bb.ll.x,
                b.bb.ll.y,
                b.bb.ur.x,
                b.bb.ur.y,
                b.name,
                (b.bb.ll.x + b.bb.ur.x) / 2.0,
                (b.bb.ll.y + b.bb.ur.y) / 2.0,
                n = i + 1,
            ));
        }
        plot.push_str("plot -1 notitle\n");
        std::fs::write(format!("{benchmark}_{}.gp", die.id), plot)?;
    }
    Ok(())
}

pub fn write_solution(path: &Path, stack: &DieStack, blocks: &BlockSet) -> Result<()> {
    std::fs::write(path, stack.cbls_string(blocks))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_blocks_and_skips_comments() {
        let f = file_with("# header\nb1 2.5 3\n\nb2 4 1\n");
        let blocks = parse_blocks(f.path()).unwrap();
        assert_eq!(blocks.len(), 2);
        let b1 = blocks.lookup("b1").unwrap();
        assert_eq!((blocks[b1].bb.w, blocks[b1].bb.h), (2.5, 3.0));
    }

    #[test]
    fn rejects_malformed_blocks() {
        for bad in ["b1 2.5", "b1 x 3", "b1 0 3", "b1 2 -1", "b1 2 3 extra"] {
            let f = file_with(bad);
            assert!(parse_blocks(f.path()).is_err(), "accepted {bad:?}");
        }
        let f = file_with("b1 1 1\nb1 2 2\n");
        assert!(parse_blocks(f.path()).is_err());
    }

    #[test]
    fn parses_nets_against_known_blocks() {
        let blocks_file = file_with("b1 1 1\nb2 2 2\nb3 3 3\n");
        let blocks = parse_blocks(blocks_file.path()).unwrap();

        let f = file_with("n1 inter b1 b3\nn2 intra b2\n");
        let nets = parse_nets(f.path(), &blocks).unwrap();
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0].kind, NetKind::InterLayer);
        assert_eq!(nets[0].blocks.len(), 2);

        let f = file_with("n1 inter b1 nope\n");
        assert!(parse_nets(f.path(), &blocks).is_err());
        let f = file_with("n1 sideways b1\n");
        assert!(parse_nets(f.path(), &blocks).is_err());
    }

    #[test]
    fn parses_alignments() {
        let blocks_file = file_with("b1 1 1\nb2 2 2\n");
        let blocks = parse_blocks(blocks_file.path()).unwrap();

        let f = file_with("b1 b2 offset 2.0 range 1.5\n");
        let reqs = parse_alignments(f.path(), &blocks).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].kind_x, AlignKind::Offset);
        assert_eq!(reqs[0].val_y, 1.5);

        let f = file_with("b1 b2 offset 2.0\n");
        assert!(parse_alignments(f.path(), &blocks).is_err());
    }
}

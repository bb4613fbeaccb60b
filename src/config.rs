use std::path::PathBuf;

use clap::Parser;

use crate::scene::SceneStyle;

#[derive(Parser, Debug)]
#[command(name = "plyview", about = "Interactive viewer for PLY meshes", long_about = None)]
pub struct Args {
    /// PLY file to display
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Draw each point's index next to its marker
    #[arg(long)]
    pub labels: bool,

    /// Opacity of the base mesh, from 0 (invisible) to 1 (opaque)
    #[arg(long, default_value_t = 1.0, value_parser = parse_opacity)]
    pub opacity: f32,

    /// Cell to highlight; may be given several times (default: cell 0)
    #[arg(long, value_name = "CELL")]
    pub highlight: Vec<usize>,

    /// Do not highlight any cell
    #[arg(long, conflicts_with = "highlight")]
    pub no_highlight: bool,

    /// Hide the point markers
    #[arg(long)]
    pub no_points: bool,

    /// Hide the base mesh edges
    #[arg(long)]
    pub no_edges: bool,

    /// Marker diameter in pixels
    #[arg(long, default_value_t = 10.0)]
    pub point_size: f32,

    /// Width of the highlighted cell edges in pixels
    #[arg(long, default_value_t = 5.0)]
    pub line_width: f32,

    /// Present frames with vsync
    #[arg(long)]
    pub vsync: bool,
}

fn parse_opacity(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=1"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HighlightSelection {
    /// Cell 0, when the mesh has any cells.
    FirstCell,
    Cells(Vec<usize>),
    Nothing,
}

impl HighlightSelection {
    pub fn resolve(&self, cell_count: usize) -> Vec<usize> {
        match self {
            HighlightSelection::FirstCell if cell_count > 0 => vec![0],
            HighlightSelection::FirstCell | HighlightSelection::Nothing => Vec::new(),
            HighlightSelection::Cells(cells) => cells.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub file: PathBuf,
    pub highlight: HighlightSelection,
    pub style: SceneStyle,
    pub vsync: bool,
}

impl ViewerConfig {
    /// Returns `None` when no file was given.
    pub fn from_args(args: Args) -> Option<Self> {
        let file = args.file?;

        let highlight = if args.no_highlight {
            HighlightSelection::Nothing
        } else if args.highlight.is_empty() {
            HighlightSelection::FirstCell
        } else {
            HighlightSelection::Cells(args.highlight)
        };

        let mut style = SceneStyle::default();
        style.mesh.color[3] = args.opacity;
        style.mesh.show_edges = !args.no_edges;
        style.highlight.line_width = args.line_width.max(1.0);
        style.markers.visible = !args.no_points;
        style.markers.size = args.point_size.max(1.0);
        style.markers.labels = args.labels;

        Some(Self {
            file,
            highlight,
            style,
            vsync: args.vsync,
        })
    }
}

pub fn usage(program: &str) -> String {
    format!("Usage: {program} <filename.ply>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(argv: &[&str]) -> Option<ViewerConfig> {
        ViewerConfig::from_args(Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn no_file_means_no_config() {
        assert!(config(&["plyview"]).is_none());
    }

    #[test]
    fn defaults_follow_scene_style() {
        let cfg = config(&["plyview", "mesh.ply"]).unwrap();
        assert_eq!(cfg.file, PathBuf::from("mesh.ply"));
        assert_eq!(cfg.highlight, HighlightSelection::FirstCell);
        assert_eq!(cfg.style, SceneStyle::default());
        assert!(!cfg.vsync);
    }

    #[test]
    fn cosmetic_flags() {
        let cfg = config(&[
            "plyview",
            "mesh.ply",
            "--labels",
            "--opacity",
            "0.5",
            "--highlight",
            "2",
            "--highlight",
            "4",
            "--no-points",
        ])
        .unwrap();

        assert!(cfg.style.markers.labels);
        assert!(!cfg.style.markers.visible);
        assert_eq!(cfg.style.mesh.color[3], 0.5);
        assert_eq!(cfg.highlight, HighlightSelection::Cells(vec![2, 4]));
    }

    #[test]
    fn opacity_out_of_range_is_rejected() {
        assert!(Args::try_parse_from(["plyview", "m.ply", "--opacity", "1.5"]).is_err());
    }

    #[test]
    fn no_highlight_conflicts_with_explicit_cells() {
        assert!(Args::try_parse_from(["plyview", "m.ply", "--no-highlight", "--highlight", "1"]).is_err());
    }

    #[test]
    fn first_cell_only_when_mesh_has_cells() {
        assert_eq!(HighlightSelection::FirstCell.resolve(3), vec![0]);
        assert!(HighlightSelection::FirstCell.resolve(0).is_empty());
        assert!(HighlightSelection::Nothing.resolve(3).is_empty());
        assert_eq!(HighlightSelection::Cells(vec![7]).resolve(3), vec![7]);
    }

    #[test]
    fn usage_names_the_program() {
        assert!(usage("plyview").contains("plyview"));
    }
}

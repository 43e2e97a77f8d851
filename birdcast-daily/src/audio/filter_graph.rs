//! TimingPlan → ffmpeg filter graph compiler
//!
//! Input `i` of the graph is layer `i` of the plan. Each layer chain
//! normalises the format, applies its delay, volume schedule and optional
//! fade-in, and is trimmed to the plan's total. The chains are mixed
//! without normalisation and the final fade-out is applied to the mix.

use super::timeline::{LayerRole, LayerTiming, TimingPlan, VolumeSchedule};
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::Path;

const SAMPLE_RATE: u32 = 44_100;
const OUTPUT_LABEL: &str = "out";
const OUTPUT_BITRATE: &str = "128k";

/// One graph input
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInput {
    pub role: LayerRole,
    pub looped: bool,
}

/// Compiled filter graph plus the input layout it expects
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub inputs: Vec<GraphInput>,
    pub filter_complex: String,
    pub total_duration_seconds: f64,
}

fn secs(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

fn gain(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

fn volume_filter(schedule: &VolumeSchedule) -> String {
    match *schedule {
        VolumeSchedule::Constant(v) => format!("volume={}", gain(v)),
        VolumeSchedule::Ducked {
            before,
            after,
            at_seconds,
        } => format!(
            "volume='if(lt(t,{}),{},{})':eval=frame",
            secs(at_seconds),
            gain(before),
            gain(after)
        ),
    }
}

fn layer_chain(index: usize, layer: &LayerTiming, plan: &TimingPlan) -> String {
    let mut filters = vec![format!(
        "aformat=sample_rates={}:channel_layouts=stereo",
        SAMPLE_RATE
    )];

    // trim looped sources before delaying so the chain is finite
    if layer.looped {
        filters.push(format!("atrim=end={}", secs(layer.duration_seconds)));
        filters.push("asetpts=PTS-STARTPTS".to_string());
    }
    if layer.delay_ms > 0 {
        filters.push(format!("adelay=delays={}:all=1", layer.delay_ms));
    }
    filters.push(volume_filter(&layer.volume));
    if layer.fade_in_seconds > 0.0 {
        filters.push(format!(
            "afade=t=in:st={}:d={}:curve={}",
            secs(layer.delay_seconds()),
            secs(layer.fade_in_seconds),
            plan.fade_curve.ffmpeg_name()
        ));
    }
    filters.push(format!("atrim=end={}", secs(plan.total_duration_seconds)));

    format!("[{}:a]{}[l{}]", index, filters.join(","), index)
}

impl FilterGraph {
    /// Compile a plan into a `-filter_complex` graph
    pub fn compile(plan: &TimingPlan) -> Self {
        let mut graph = String::new();
        for (i, layer) in plan.layers.iter().enumerate() {
            graph.push_str(&layer_chain(i, layer, plan));
            graph.push(';');
        }

        for i in 0..plan.layers.len() {
            let _ = write!(graph, "[l{}]", i);
        }
        if plan.layers.len() > 1 {
            let _ = write!(
                graph,
                "amix=inputs={}:duration=longest:dropout_transition=0:normalize=0,",
                plan.layers.len()
            );
        } else {
            graph.push_str("anull,");
        }

        let _ = write!(
            graph,
            "afade=t=out:st={}:d={}:curve={},atrim=end={}[{}]",
            secs(plan.fade_out_start_seconds),
            secs(plan.fade_out_duration_seconds),
            plan.fade_curve.ffmpeg_name(),
            secs(plan.total_duration_seconds),
            OUTPUT_LABEL
        );

        Self {
            inputs: plan
                .layers
                .iter()
                .map(|l| GraphInput {
                    role: l.role,
                    looped: l.looped,
                })
                .collect(),
            filter_complex: graph,
            total_duration_seconds: plan.total_duration_seconds,
        }
    }

    /// Full ffmpeg argument list for the given input files and output path
    ///
    /// `input_paths` must be in graph input order.
    pub fn ffmpeg_args(&self, input_paths: &[&Path], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y"]
            .iter()
            .map(OsString::from)
            .collect();

        for (input, path) in self.inputs.iter().zip(input_paths) {
            if input.looped {
                args.push("-stream_loop".into());
                args.push("-1".into());
            }
            args.push("-i".into());
            args.push(path.as_os_str().to_owned());
        }

        args.push("-filter_complex".into());
        args.push(self.filter_complex.clone().into());
        args.push("-map".into());
        args.push(format!("[{}]", OUTPUT_LABEL).into());
        args.push("-t".into());
        args.push(secs(self.total_duration_seconds).into());
        args.push("-c:a".into());
        args.push("libmp3lame".into());
        args.push("-b:a".into());
        args.push(OUTPUT_BITRATE.into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::timeline::{IntroTemplate, NarrationTemplate, OutroTemplate};
    use birdcast_common::FadeCurve;

    #[test]
    fn test_intro_graph() {
        let plan = IntroTemplate::default().plan(Some(6.0), Some(1.0), FadeCurve::SCurve);
        let graph = FilterGraph::compile(&plan);
        let g = &graph.filter_complex;

        assert_eq!(graph.inputs.len(), 3);
        assert!(graph.inputs[0].looped);
        assert_eq!(graph.inputs[2].role, LayerRole::Voice);

        assert!(g.contains("volume='if(lt(t,3.000),0.350,0.150)':eval=frame"));
        assert!(g.contains("afade=t=in:st=0.000:d=2.500:curve=hsin"));
        assert!(g.contains("adelay=delays=500:all=1"));
        assert!(g.contains("adelay=delays=3000:all=1"));
        assert!(g.contains("volume=2.000"));
        assert!(g.contains("amix=inputs=3:duration=longest:dropout_transition=0:normalize=0"));
        assert!(g.ends_with("afade=t=out:st=9.000:d=2.000:curve=hsin,atrim=end=11.000[out]"));
    }

    #[test]
    fn test_outro_graph_loops_birdsong() {
        let plan = OutroTemplate::default().plan(Some(5.0), FadeCurve::Linear);
        let graph = FilterGraph::compile(&plan);
        assert!(graph
            .filter_complex
            .starts_with("[0:a]aformat=sample_rates=44100:channel_layouts=stereo,atrim=end=10.000,asetpts=PTS-STARTPTS,volume=0.150"));
        assert!(graph.filter_complex.contains("curve=tri"));
    }

    #[test]
    fn test_single_layer_skips_amix() {
        let mut plan = NarrationTemplate::default().plan(Some(3.0), FadeCurve::Linear);
        plan.layers.retain(|l| l.role == LayerRole::Voice);
        let graph = FilterGraph::compile(&plan);
        assert!(!graph.filter_complex.contains("amix"));
        assert!(graph.filter_complex.contains("[l0]anull,afade=t=out"));
    }

    #[test]
    fn test_ffmpeg_args_layout() {
        let plan = OutroTemplate::default().plan(Some(5.0), FadeCurve::Linear);
        let graph = FilterGraph::compile(&plan);
        let bird = Path::new("/tmp/x/input_0.mp3");
        let voice = Path::new("/tmp/x/input_1.mp3");
        let out = Path::new("/tmp/x/mix.mp3");
        let args: Vec<String> = graph
            .ffmpeg_args(&[bird, voice], out)
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[loop_pos + 1], "-1");
        assert_eq!(args[loop_pos + 3], "/tmp/x/input_0.mp3");
        assert_eq!(args.iter().filter(|a| *a == "-stream_loop").count(), 1);
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "10.000"));
        assert_eq!(args.last().unwrap(), "/tmp/x/mix.mp3");
    }
}

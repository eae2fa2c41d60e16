//! Source patches that let Chromium's media stack accept the extra codecs.

use crate::patches::{PendingEdit, WriteMode, indent_of, newline_of, read_file};
use crate::report::Summary;
use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;

/// A media source file and the function that patches it.
pub type MediaPatch = fn(&str) -> Result<(String, Vec<String>)>;

pub const TARGETS: [(&str, MediaPatch); 4] = [
    ("media/base/supported_types.cc", patch_supported_types),
    ("media/ffmpeg/ffmpeg_common.cc", patch_ffmpeg_common),
    ("media/filters/ffmpeg_video_decoder.cc", patch_ffmpeg_video_decoder),
    ("media/filters/ffmpeg_glue.cc", patch_ffmpeg_glue_demuxers),
];

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid media regex")
}

static AUDIO_FN: Lazy<Regex> = Lazy::new(|| regex(r"IsDefault(?:Decoder)?SupportedAudioType"));
static VIDEO_FN: Lazy<Regex> = Lazy::new(|| regex(r"IsDefault(?:Decoder)?SupportedVideoType"));

static DTS_RETURN: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"(?P<cases>case\s+AudioCodec::kDTS:\s*\n",
        r"(?:\s*case\s+AudioCodec::kDTSXP2:\s*\n)?",
        r"(?:\s*case\s+AudioCodec::kDTSE:\s*\n)?",
        r"\s*)",
        r"return\s+BUILDFLAG\s*\(\s*ENABLE_PLATFORM_DTS_AUDIO\s*\)\s*;",
    ))
});
static AC3_RETURN: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"(?P<cases>case\s+AudioCodec::kAC3:\s*\n",
        r"\s*case\s+AudioCodec::kEAC3:\s*\n",
        r"\s*)",
        r"return\s+IsDecoderDolbyAc3Eac3Supported\s*\(\s*type\s*\)\s*;",
    ))
});
static HEVC_RETURN: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"(?P<cases>case\s+VideoCodec::kHEVC:\s*\n\s*)",
        r"return\s+IsDecoderHevcProfileSupported\s*\(\s*type\s*\)\s*;",
    ))
});

static AC3_CASE: Lazy<Regex> = Lazy::new(|| regex(r"case\s+AudioCodec::kAC3:"));
static HEVC_CASE: Lazy<Regex> = Lazy::new(|| regex(r"case\s+VideoCodec::kHEVC:"));
static AAC_CASE_LINE: Lazy<Regex> = Lazy::new(|| regex(r"[ \t]*case\s+AudioCodec::kAAC:"));
static H264_CASE_LINE: Lazy<Regex> = Lazy::new(|| regex(r"[ \t]*case\s+VideoCodec::kH264:"));

static AAC_MAPPING: Lazy<Regex> =
    Lazy::new(|| regex(r"(case\s+AudioCodec::kAAC:\s*\n\s*return\s+AV_CODEC_ID_AAC;\s*\n)"));
static H264_MAPPING: Lazy<Regex> =
    Lazy::new(|| regex(r"(case\s+VideoCodec::kH264:\s*\n\s*return\s+AV_CODEC_ID_H264;\s*\n)"));
static H264_ALLOWLIST: Lazy<Regex> = Lazy::new(|| regex(r#"return\s+"h264"\s*;"#));
static EXTRA_CODECS: Lazy<Regex> = Lazy::new(|| regex(r#"#define\s+EXTRA_CODECS\s+",aac""#));

static HEVC_CASE_LINE: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)^[ \t]*case\s+VideoCodec::kHEVC:[ \t]*\r?\n"));
static FALLS_INTO_NOTREACHED: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"^(?:[ \t]*case\s+VideoCodec::\w+:\s*\n)*",
        r"[ \t]*(?://[^\n]*\n\s*)*NOTREACHED",
    ))
});
static HEVC_BEFORE_H264: Lazy<Regex> =
    Lazy::new(|| regex(r"case\s+VideoCodec::kHEVC:\s*\n\s*case\s+VideoCodec::kH264:"));

static AAC_DEMUXER: Lazy<Regex> = Lazy::new(|| {
    regex(r#"(?m)^[ \t]*allowed_demuxers\.push_back\(\s*"aac"\s*\)\s*;[ \t]*\r?\n"#)
});

const EXTRA_DEMUXERS: [&str; 3] = ["ac3", "eac3", "dts"];

/// Patch all media sources under `root`.
///
/// Every file is checked and patched in memory first; nothing is written
/// unless all of them succeed.
pub fn run(root: &Path, mode: WriteMode) -> Result<Summary> {
    for (relative, _) in TARGETS {
        let path = root.join(relative);
        if !path.is_file() {
            bail!("missing file: {}", path.display());
        }
    }

    let mut edits = Vec::with_capacity(TARGETS.len());
    for (relative, patch) in TARGETS {
        let path = root.join(relative);
        let original = read_file(&path)?;
        let (patched, notes) =
            patch(&original).with_context(|| format!("failed to patch {}", path.display()))?;
        edits.push(PendingEdit {
            path,
            original,
            patched,
            notes,
        });
    }

    let mut summary = Summary::new("media", mode.dry_run);
    for edit in &edits {
        if edit.changed() {
            summary.changes.extend(edit.notes.iter().cloned());
        }
        summary.file_changed(edit.commit(mode)?);
    }
    Ok(summary)
}

/// Replace every guarded return with `return true;`, keeping the case labels.
fn force_return_true(re: &Regex, text: &str) -> (String, usize) {
    let count = re.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    let patched = re.replace_all(text, "${cases}return true;").into_owned();
    (patched, count)
}

fn insert_at(text: &str, at: usize, insert: &str) -> String {
    format!("{}{}{}", &text[..at], insert, &text[at..])
}

/// Make `IsDefault[Decoder]Supported{Audio,Video}Type` accept DTS, AC3/EAC3 and HEVC.
pub fn patch_supported_types(text: &str) -> Result<(String, Vec<String>)> {
    if !AUDIO_FN.is_match(text) {
        bail!("could not find IsDefault[Decoder]SupportedAudioType in supported_types.cc");
    }
    if !VIDEO_FN.is_match(text) {
        bail!("could not find IsDefault[Decoder]SupportedVideoType in supported_types.cc");
    }

    let mut notes = vec![];
    let mut text = text.to_string();
    for (re, label) in [
        (&*DTS_RETURN, "DTS"),
        (&*AC3_RETURN, "AC3/EAC3"),
        (&*HEVC_RETURN, "HEVC"),
    ] {
        let (patched, count) = force_return_true(re, &text);
        if count > 0 {
            notes.push(format!("supported_types.cc: {label} return override x{count}"));
            text = patched;
        }
    }

    let newline = newline_of(&text);
    if !AC3_CASE.is_match(&text) {
        let Some(m) = AAC_CASE_LINE.find(&text) else {
            bail!("could not find AudioCodec::kAAC insertion point");
        };
        let indent = indent_of(m.as_str());
        let insert: String = ["kAC3", "kEAC3", "kDTS", "kDTSXP2"]
            .iter()
            .map(|codec| format!("{indent}case AudioCodec::{codec}:{newline}"))
            .collect();
        text = insert_at(&text, m.start(), &insert);
        notes.push("supported_types.cc: inserted AC3/EAC3/DTS/DTSXP2 fallback cases".to_string());
    }

    if !HEVC_CASE.is_match(&text) {
        let Some(m) = H264_CASE_LINE.find(&text) else {
            bail!("could not find VideoCodec::kH264 insertion point");
        };
        let indent = indent_of(m.as_str());
        let insert =
            format!("{indent}case VideoCodec::kHEVC:{newline}{indent}  return true;{newline}");
        text = insert_at(&text, m.start(), &insert);
        notes.push("supported_types.cc: inserted HEVC fallback case".to_string());
    }

    Ok((text, notes))
}

/// Codec-id mappings and decoder allowlists in ffmpeg_common.cc.
pub fn patch_ffmpeg_common(text: &str) -> Result<(String, Vec<String>)> {
    let mut notes = vec![];
    let mut text = text.to_string();

    if ["AV_CODEC_ID_AC3", "AV_CODEC_ID_EAC3", "AV_CODEC_ID_DTS"]
        .iter()
        .any(|id| !text.contains(id))
    {
        if !AAC_MAPPING.is_match(&text) {
            bail!("could not find AAC mapping block in ffmpeg_common.cc");
        }
        let add = concat!(
            "    case AudioCodec::kAC3:\n      return AV_CODEC_ID_AC3;\n",
            "    case AudioCodec::kEAC3:\n      return AV_CODEC_ID_EAC3;\n",
            "    case AudioCodec::kDTS:\n      return AV_CODEC_ID_DTS;\n",
        );
        text = AAC_MAPPING
            .replacen(&text, 1, |caps: &Captures| format!("{}{add}", &caps[1]))
            .into_owned();
        notes.push("ffmpeg_common.cc: inserted AC3/EAC3/DTS codec ID mappings".to_string());
    }

    if !text.contains("AV_CODEC_ID_HEVC") {
        if !H264_MAPPING.is_match(&text) {
            bail!("could not find H264 mapping block in ffmpeg_common.cc");
        }
        let add = "    case VideoCodec::kHEVC:\n      return AV_CODEC_ID_HEVC;\n";
        text = H264_MAPPING
            .replacen(&text, 1, |caps: &Captures| format!("{}{add}", &caps[1]))
            .into_owned();
        notes.push("ffmpeg_common.cc: inserted HEVC codec ID mapping".to_string());
    }

    // allowlists may already be widened upstream; absence is not fatal
    if !text.contains(r#""h264,hevc""#) && H264_ALLOWLIST.is_match(&text) {
        text = H264_ALLOWLIST
            .replacen(&text, 1, r#"return "h264,hevc";"#)
            .into_owned();
        notes.push("ffmpeg_common.cc: added hevc to GetAllowedVideoDecoders allowlist".to_string());
    }

    if [",ac3", ",eac3", ",dca"].iter().any(|c| !text.contains(c)) && EXTRA_CODECS.is_match(&text) {
        text = EXTRA_CODECS
            .replacen(&text, 1, r#"#define EXTRA_CODECS ",aac,ac3,eac3,dca""#)
            .into_owned();
        notes.push(
            "ffmpeg_common.cc: added ac3/eac3/dca to GetAllowedAudioDecoders allowlist".to_string(),
        );
    }

    Ok((text, notes))
}

/// Move HEVC out of the `NOTREACHED` group into the multithreaded decode path.
pub fn patch_ffmpeg_video_decoder(text: &str) -> Result<(String, Vec<String>)> {
    let mut notes = vec![];
    let mut text = text.to_string();

    let unreachable = HEVC_CASE_LINE
        .find_iter(&text)
        .find(|m| FALLS_INTO_NOTREACHED.is_match(&text[m.end()..]))
        .map(|m| m.range());
    if let Some(range) = unreachable {
        text.replace_range(range, "");
        notes.push("ffmpeg_video_decoder.cc: removed HEVC from NOTREACHED group".to_string());
    }

    if !HEVC_BEFORE_H264.is_match(&text) {
        let Some(m) = H264_CASE_LINE.find(&text) else {
            bail!("could not find H264 case in ffmpeg_video_decoder.cc");
        };
        let insert = format!(
            "{}case VideoCodec::kHEVC:{}",
            indent_of(m.as_str()),
            newline_of(&text)
        );
        text = insert_at(&text, m.start(), &insert);
        notes.push("ffmpeg_video_decoder.cc: inserted HEVC into multithread branch".to_string());
    }

    Ok((text, notes))
}

/// Allow the standalone AC3/EAC3/DTS demuxers in `GetAllowedDemuxers()`.
pub fn patch_ffmpeg_glue_demuxers(text: &str) -> Result<(String, Vec<String>)> {
    let missing: Vec<&str> = EXTRA_DEMUXERS
        .into_iter()
        .filter(|d| !text.contains(&format!("push_back(\"{d}\")")))
        .collect();
    if missing.is_empty() {
        return Ok((text.to_string(), vec![]));
    }

    let Some(m) = AAC_DEMUXER.find(text) else {
        bail!("could not find aac demuxer push_back in ffmpeg_glue.cc");
    };
    let indent = indent_of(m.as_str());
    let newline = newline_of(text);
    let insert: String = missing
        .iter()
        .map(|d| format!("{indent}allowed_demuxers.push_back(\"{d}\");{newline}"))
        .collect();
    let patched = insert_at(text, m.end(), &insert);
    let note = format!(
        "ffmpeg_glue.cc: inserted {} demuxer allowlist entries",
        missing.join("/")
    );
    Ok((patched, vec![note]))
}

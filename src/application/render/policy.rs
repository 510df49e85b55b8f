/// Fixed encoder settings applied to every render.
///
/// Nothing in a request can override these; the service only ever produces
/// H.264/AAC MP4 tuned for a single repeated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPolicy {
    pub video_codec: &'static str,
    pub tune: &'static str,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub pixel_format: &'static str,
    /// Stop at the shorter input; the looped image is infinite, so this tracks the audio.
    pub stop_at_shortest: bool,
}

impl RenderPolicy {
    pub const STILL_IMAGE: RenderPolicy = RenderPolicy {
        video_codec: "libx264",
        tune: "stillimage",
        audio_codec: "aac",
        audio_bitrate: "192k",
        pixel_format: "yuv420p",
        stop_at_shortest: true,
    };
}

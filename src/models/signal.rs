/// A raw observation from one of the signal sources. Ephemeral: produced by
/// exactly one source and consumed once by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSignal {
    /// Browser/host visibility transition. Every transition is forwarded,
    /// no debouncing.
    FocusChanged { visible: bool },
    /// The input pointer exited the monitored viewport region.
    PointerLeft,
    /// The input pointer re-entered the monitored viewport region.
    PointerEntered,
    /// Milliseconds since the previous key press in this session.
    KeyInterval { ms: u64 },
    /// A still frame sampled from the camera feed, PNG-encoded.
    FrameCaptured { png: Vec<u8> },
}

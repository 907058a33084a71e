#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a search term.
    SearchSubmitted(String),
    /// User skipped to the next image.
    AdvanceClicked,
    /// User rejected the current image; same transition as advancing.
    DiscardClicked,
    /// User confirmed the current image as belonging to the target class.
    ConfirmClicked(crate::ImageClass),
    /// Image source answered a search effect.
    SearchCompleted {
        request_id: crate::RequestId,
        result: Result<Vec<crate::ImageReference>, crate::RemoteFetchError>,
    },
    /// Classification sink answered a classify effect.
    ClassifyCompleted {
        request_id: crate::RequestId,
        result: Result<(), crate::RemoteFetchError>,
    },
}

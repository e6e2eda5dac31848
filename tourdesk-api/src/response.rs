use serde::Serialize;

/// `{ "success": true, ...body }`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self { success: true, body }
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

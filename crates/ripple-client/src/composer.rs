use std::collections::HashSet;

use uuid::Uuid;

use ripple_types::models::{Attachment, AttachmentKind};

use crate::ClientError;

/// Response shape of the upload service's `/uploads/single` endpoint.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub url: String,
    pub resource_type: String,
}

/// Ephemeral composer state: edit/reply targets, bulk-delete selection and
/// staged attachments. Local only, with no server equivalent; cleared
/// wholesale on send, cancel or Escape.
#[derive(Debug, Default)]
pub struct Composer {
    pub draft: String,
    pub editing_id: Option<Uuid>,
    pub reply_to_id: Option<Uuid>,
    pub selected_ids: HashSet<Uuid>,
    pub attachments: Vec<Attachment>,
}

impl Composer {
    pub fn begin_edit(&mut self, message_id: Uuid, current_content: &str) {
        self.editing_id = Some(message_id);
        self.reply_to_id = None;
        self.draft = current_content.to_string();
    }

    pub fn begin_reply(&mut self, message_id: Uuid) {
        self.reply_to_id = Some(message_id);
        self.editing_id = None;
    }

    pub fn toggle_selected(&mut self, message_id: Uuid) {
        if !self.selected_ids.remove(&message_id) {
            self.selected_ids.insert(message_id);
        }
    }

    /// Stage an upload result. A failed upload must never end up referenced
    /// by a sent message, so it surfaces as an error and stages nothing.
    pub fn stage_upload(
        &mut self,
        result: Result<UploadedFile, String>,
        name: Option<String>,
    ) -> Result<(), ClientError> {
        let uploaded = result.map_err(ClientError::UpstreamUploadFailure)?;
        let kind = match uploaded.resource_type.as_str() {
            "image" => AttachmentKind::Image,
            "video" => AttachmentKind::Video,
            _ => AttachmentKind::File,
        };
        self.attachments.push(Attachment {
            kind,
            url: uploaded.url,
            name,
        });
        Ok(())
    }

    /// Drop a message's traces from composer state after it was deleted
    /// under us.
    pub fn forget_message(&mut self, message_id: Uuid) {
        if self.editing_id == Some(message_id) {
            self.editing_id = None;
            self.draft.clear();
        }
        if self.reply_to_id == Some(message_id) {
            self.reply_to_id = None;
        }
        self.selected_ids.remove(&message_id);
    }

    /// Send / cancel / Escape.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

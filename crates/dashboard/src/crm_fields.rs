//! CRM field collection of the selected campaign.
//!
//! The backend is authoritative for positions: after an edit or delete (and
//! after a create that renumbered siblings) the local list is replaced by
//! the list the server sent back, in the order it was sent. Field order is
//! only computed locally when a campaign is selected.

use api_types::{
    crm::{Campaign, CrmConfiguration, CrmField, CrmFieldAttrs},
    envelope::{Envelope, ResponseStatus},
};

use crate::{
    client::{Client, ClientError},
    error::ManagerError,
    mutation::{InFlight, MutationOutcome, RecordKey, Ticket},
    validation::{CrmFieldForm, FormValues, ValidationErrors, campaign_selector_schema},
};

/// Decoded answer to a CRM field mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// Refused by the backend (duplicate caption, bad position, ...).
    Rejected(String),
    /// The server sent the full, renumbered field list.
    Replaced(Vec<CrmField>),
    /// Plain create success carrying only the new field.
    Appended(CrmField),
}

impl FieldChange {
    /// Create responses come in three shapes: failure, positions-updated
    /// with the whole list, or the created field alone.
    pub fn from_create(envelope: Envelope) -> Result<Self, ManagerError> {
        if envelope.is_rejection() {
            return Ok(Self::Rejected(rejection_message(envelope.message)));
        }
        let data = envelope
            .data
            .ok_or_else(|| ManagerError::UnexpectedResponse("missing data".to_string()))?;

        if envelope.status == Some(ResponseStatus::PositionsUpdated) {
            return Ok(Self::Replaced(serde_json::from_value(data)?));
        }
        Ok(Self::Appended(serde_json::from_value(data)?))
    }

    /// Edit and delete responses: failure, or the authoritative list.
    pub fn from_update(envelope: Envelope) -> Result<Self, ManagerError> {
        if envelope.is_rejection() {
            return Ok(Self::Rejected(rejection_message(envelope.message)));
        }
        let data = envelope
            .data
            .ok_or_else(|| ManagerError::UnexpectedResponse("missing data".to_string()))?;
        Ok(Self::Replaced(serde_json::from_value(data)?))
    }
}

fn rejection_message(message: Option<String>) -> String {
    message.unwrap_or_else(|| "request refused by the server".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRequest {
    Create(CrmFieldAttrs),
    Edit {
        field_id: String,
        attrs: CrmFieldAttrs,
    },
    Delete {
        field_id: String,
    },
}

/// A validated mutation, registered as in flight, ready to be sent.
#[derive(Debug)]
pub struct PreparedField {
    ticket: Ticket,
    admin_id: String,
    campaign_id: String,
    request: FieldRequest,
}

impl PreparedField {
    pub fn request(&self) -> &FieldRequest {
        &self.request
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Sends the request. A 409 is folded into [`FieldChange::Rejected`].
    pub async fn send(&self, client: &Client) -> Result<FieldChange, ManagerError> {
        let (admin, campaign) = (self.admin_id.as_str(), self.campaign_id.as_str());
        let result = match &self.request {
            FieldRequest::Create(attrs) => client
                .create_crm_field(admin, campaign, attrs)
                .await
                .map(FieldChange::from_create),
            FieldRequest::Edit { field_id, attrs } => client
                .edit_crm_field(admin, campaign, field_id, attrs)
                .await
                .map(FieldChange::from_update),
            FieldRequest::Delete { field_id } => client
                .delete_crm_field(admin, campaign, field_id)
                .await
                .map(FieldChange::from_update),
        };

        match result {
            Ok(change) => change,
            Err(ClientError::Conflict(message)) => Ok(FieldChange::Rejected(message)),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct CrmFieldManager {
    config: Option<CrmConfiguration>,
    selected: Option<String>,
    in_flight: InFlight,
}

impl CrmFieldManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts a configuration snapshot. The selection survives when the
    /// selected campaign is still present.
    pub fn load(&mut self, mut config: CrmConfiguration) {
        self.selected = self
            .selected
            .take()
            .filter(|id| config.campaigns.iter().any(|campaign| &campaign.id == id));
        if let Some(id) = &self.selected {
            if let Some(campaign) = config.campaigns.iter_mut().find(|c| &c.id == id) {
                sort_by_position(&mut campaign.crm_fields);
            }
        }
        tracing::debug!(campaigns = config.campaigns.len(), "crm configuration loaded");
        self.config = Some(config);
        self.in_flight.mark_snapshot();
    }

    pub async fn refresh(&mut self, client: &Client) -> Result<(), ManagerError> {
        let config = client.crm_configuration().await?;
        self.load(config);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.config.is_some()
    }

    pub fn admin_id(&self) -> Option<&str> {
        self.config.as_ref().map(|config| config.id.as_str())
    }

    pub fn campaigns(&self) -> &[Campaign] {
        self.config
            .as_ref()
            .map(|config| config.campaigns.as_slice())
            .unwrap_or(&[])
    }

    pub fn campaign_names(&self) -> Vec<&str> {
        self.campaigns()
            .iter()
            .map(|campaign| campaign.campaign_name.as_str())
            .collect()
    }

    pub fn selected_campaign(&self) -> Option<&Campaign> {
        let id = self.selected.as_deref()?;
        self.campaigns().iter().find(|campaign| campaign.id == id)
    }

    /// Fields of the selected campaign, in display order.
    pub fn fields(&self) -> &[CrmField] {
        self.selected_campaign()
            .map(|campaign| campaign.crm_fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_pending(&self, field_id: &str) -> bool {
        self.in_flight
            .is_pending(&RecordKey::Record(field_id.to_string()))
    }

    /// Resolves `name` among the loaded campaigns and returns its fields
    /// sorted by position. Equal positions keep the server order.
    ///
    /// An unknown or ambiguous name is an error and leaves the current
    /// selection untouched.
    pub fn select_campaign(&mut self, name: &str) -> Result<&[CrmField], ManagerError> {
        campaign_selector_schema()
            .validate(&FormValues::new().with("campaignName", name))
            .map_err(ManagerError::Invalid)?;

        let config = self.config.as_mut().ok_or(ManagerError::NotLoaded)?;
        let mut matches = config
            .campaigns
            .iter_mut()
            .filter(|campaign| campaign.campaign_name == name);
        let campaign = matches
            .next()
            .ok_or_else(|| ManagerError::CampaignNotFound(name.to_string()))?;
        if matches.next().is_some() {
            return Err(ManagerError::AmbiguousCampaign(name.to_string()));
        }

        sort_by_position(&mut campaign.crm_fields);
        self.selected = Some(campaign.id.clone());
        Ok(campaign.crm_fields.as_slice())
    }

    fn selection(&self) -> Result<(String, String), ManagerError> {
        let admin_id = self.admin_id().ok_or(ManagerError::NotLoaded)?.to_string();
        let campaign_id = self
            .selected_campaign()
            .ok_or(ManagerError::NoCampaignSelected)?
            .id
            .clone();
        Ok((admin_id, campaign_id))
    }

    fn begin(
        &mut self,
        key: RecordKey,
        request: FieldRequest,
    ) -> Result<PreparedField, ManagerError> {
        let (admin_id, campaign_id) = self.selection()?;
        let ticket = self
            .in_flight
            .begin(key)
            .map_err(|key| ManagerError::Pending(key.to_string()))?;
        Ok(PreparedField {
            ticket,
            admin_id,
            campaign_id,
            request,
        })
    }

    fn find_field(&self, field_id: &str) -> Result<&CrmField, ManagerError> {
        self.fields()
            .iter()
            .find(|field| field.id == field_id)
            .ok_or_else(|| ManagerError::RecordNotFound(field_id.to_string()))
    }

    /// Validates a create locally. A new field may be placed anywhere up to
    /// one past the current last position.
    pub fn prepare_add(&mut self, attrs: CrmFieldAttrs) -> Result<PreparedField, ManagerError> {
        let (_, campaign_id) = self.selection()?;
        CrmFieldForm::check(&attrs)?;
        let max = self.fields().len() as u32 + 1;
        check_position(attrs.position, max)?;
        self.begin(RecordKey::Create(campaign_id), FieldRequest::Create(attrs))
    }

    /// Validates an edit locally, with the same position bound as a create.
    pub fn prepare_edit(
        &mut self,
        field_id: &str,
        attrs: CrmFieldAttrs,
    ) -> Result<PreparedField, ManagerError> {
        self.selection()?;
        self.find_field(field_id)?;
        CrmFieldForm::check(&attrs)?;
        let max = self.fields().len() as u32 + 1;
        check_position(attrs.position, max)?;
        self.begin(
            RecordKey::Record(field_id.to_string()),
            FieldRequest::Edit {
                field_id: field_id.to_string(),
                attrs,
            },
        )
    }

    pub fn prepare_delete(&mut self, field_id: &str) -> Result<PreparedField, ManagerError> {
        self.selection()?;
        self.find_field(field_id)?;
        self.begin(
            RecordKey::Record(field_id.to_string()),
            FieldRequest::Delete {
                field_id: field_id.to_string(),
            },
        )
    }

    /// Releases a prepared mutation whose request failed without an answer.
    pub fn abandon(&mut self, prepared: PreparedField) {
        self.in_flight.finish(&prepared.ticket);
    }

    /// Reconciles the answer to `prepared` with the cached configuration.
    pub fn apply(&mut self, prepared: PreparedField, change: FieldChange) -> MutationOutcome {
        self.in_flight.finish(&prepared.ticket);

        let replacement = matches!(change, FieldChange::Replaced(_));
        if replacement
            && !self
                .in_flight
                .accept_replacement(&prepared.campaign_id, &prepared.ticket)
        {
            tracing::warn!(
                campaign = %prepared.campaign_id,
                seq = prepared.ticket.seq(),
                "dropping stale field list"
            );
            return MutationOutcome::Stale;
        }

        let Some(campaign) = self.config.as_mut().and_then(|config| {
            config
                .campaigns
                .iter_mut()
                .find(|campaign| campaign.id == prepared.campaign_id)
        }) else {
            return MutationOutcome::Stale;
        };

        match change {
            FieldChange::Rejected(message) => {
                tracing::info!(campaign = %prepared.campaign_id, %message, "field mutation rejected");
                MutationOutcome::Rejected(message)
            }
            FieldChange::Replaced(fields) => {
                tracing::info!(
                    campaign = %prepared.campaign_id,
                    fields = fields.len(),
                    "field list replaced"
                );
                campaign.crm_fields = fields;
                MutationOutcome::Replaced
            }
            FieldChange::Appended(field) => {
                tracing::info!(campaign = %prepared.campaign_id, field = %field.id, "field appended");
                match campaign.crm_fields.iter_mut().find(|f| f.id == field.id) {
                    Some(existing) => *existing = field,
                    None => campaign.crm_fields.push(field),
                }
                MutationOutcome::Appended
            }
        }
    }

    async fn execute(
        &mut self,
        client: &Client,
        prepared: PreparedField,
    ) -> Result<MutationOutcome, ManagerError> {
        match prepared.send(client).await {
            Ok(change) => Ok(self.apply(prepared, change)),
            Err(err) => {
                if err.is_retryable() {
                    tracing::warn!("crm field request failed: {err}");
                }
                self.abandon(prepared);
                Err(err)
            }
        }
    }

    pub async fn add_field(
        &mut self,
        client: &Client,
        attrs: CrmFieldAttrs,
    ) -> Result<MutationOutcome, ManagerError> {
        let prepared = self.prepare_add(attrs)?;
        self.execute(client, prepared).await
    }

    pub async fn edit_field(
        &mut self,
        client: &Client,
        field_id: &str,
        attrs: CrmFieldAttrs,
    ) -> Result<MutationOutcome, ManagerError> {
        let prepared = self.prepare_edit(field_id, attrs)?;
        self.execute(client, prepared).await
    }

    pub async fn delete_field(
        &mut self,
        client: &Client,
        field_id: &str,
    ) -> Result<MutationOutcome, ManagerError> {
        let prepared = self.prepare_delete(field_id)?;
        self.execute(client, prepared).await
    }
}

fn check_position(position: u32, max: u32) -> Result<(), ManagerError> {
    if position == 0 {
        let mut errors = ValidationErrors::default();
        errors.insert("position", "Position must be at least 1");
        return Err(ManagerError::Invalid(errors));
    }
    if position > max {
        return Err(ManagerError::PositionOutOfRange { max });
    }
    Ok(())
}

fn sort_by_position(fields: &mut [CrmField]) {
    fields.sort_by_key(|field| field.position);
}

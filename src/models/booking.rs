use serde::{Deserialize, Serialize};

// Either an existing customer or the details of one to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactChoice {
    Existing {
        customer_id: String,
    },
    New {
        email: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        phone: Option<String>,
    },
}

impl ContactChoice {
    pub fn is_complete(&self) -> bool {
        match self {
            ContactChoice::Existing { customer_id } => !customer_id.trim().is_empty(),
            ContactChoice::New { email, .. } => !email.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineChoice {
    Existing { pipeline_id: String, stage_id: String },
    New { name: String },
}

impl PipelineChoice {
    pub fn is_complete(&self) -> bool {
        match self {
            PipelineChoice::Existing {
                pipeline_id,
                stage_id,
            } => !pipeline_id.trim().is_empty() && !stage_id.trim().is_empty(),
            PipelineChoice::New { name } => !name.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingForm {
    pub contact: Option<ContactChoice>,
    pub pipeline: Option<PipelineChoice>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEdit {
    Contact(Option<ContactChoice>),
    Pipeline(Option<PipelineChoice>),
    Description(Option<String>),
    Color(Option<String>),
}

impl BookingForm {
    pub fn apply(&mut self, edit: FormEdit) {
        match edit {
            FormEdit::Contact(c) => self.contact = c,
            FormEdit::Pipeline(p) => self.pipeline = p,
            FormEdit::Description(d) => self.description = d,
            FormEdit::Color(c) => self.color = c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_completeness() {
        let blank = ContactChoice::New {
            email: "  ".to_string(),
            name: Some("Ann".to_string()),
            phone: None,
        };
        assert!(!blank.is_complete());
        let existing = ContactChoice::Existing {
            customer_id: "c-1".to_string(),
        };
        assert!(existing.is_complete());
    }

    #[test]
    fn test_pipeline_needs_stage() {
        let p = PipelineChoice::Existing {
            pipeline_id: "p-1".to_string(),
            stage_id: String::new(),
        };
        assert!(!p.is_complete());
        assert!(PipelineChoice::New {
            name: "Onboarding".to_string()
        }
        .is_complete());
    }

    #[test]
    fn test_tagged_wire_format() {
        let json = r#"{"kind":"new","email":"ann@example.com"}"#;
        let contact: ContactChoice = serde_json::from_str(json).unwrap();
        assert_eq!(
            contact,
            ContactChoice::New {
                email: "ann@example.com".to_string(),
                name: None,
                phone: None
            }
        );
    }

    #[test]
    fn test_form_apply_edits() {
        let mut form = BookingForm::default();
        form.apply(FormEdit::Description(Some("intro call".to_string())));
        form.apply(FormEdit::Color(Some("#ff0000".to_string())));
        assert_eq!(form.description.as_deref(), Some("intro call"));
        assert_eq!(form.color.as_deref(), Some("#ff0000"));
        assert!(form.contact.is_none());
    }
}

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::workflows::membership::domain::{ApplicationRecord, DocumentKind};

const NOT_SPECIFIED: &str = "not specified";
const SIGNATURE_LINE: &str = "Signature: ____________________   Date: {{issued_on}}";

/// Fixed wording of one generated document. Placeholders use `{{name}}`.
#[derive(Debug)]
pub struct DocumentTemplate {
    pub kind: DocumentKind,
    pub title: &'static str,
    pub paragraphs: &'static [&'static str],
}

static MEMBERSHIP_APPLICATION: DocumentTemplate = DocumentTemplate {
    kind: DocumentKind::MembershipApplication,
    title: "Application for trade union membership",
    paragraphs: &[
        "To the chairman of {{organization_name}}",
        "From {{full_name}}, born {{birth_date}}",
        "Workplace: {{workplace}}. Position: {{position}}. Employed since: {{hire_date}}",
        "Address: {{address}}. Phone: {{phone}}. E-mail: {{email}}",
        "I ask to be admitted as a member of the trade union. I acknowledge the union charter \
         and undertake to pay membership dues.",
        "Application number {{application_id}}",
        SIGNATURE_LINE,
    ],
};

static PERSONAL_DATA_CONSENT: DocumentTemplate = DocumentTemplate {
    kind: DocumentKind::PersonalDataConsent,
    title: "Consent to personal data processing",
    paragraphs: &[
        "I, {{full_name}}, born {{birth_date}}, consent to {{organization_name}} and its parent \
         union bodies processing my personal data: surname, name, patronymic, date of birth, \
         contact details, place of work and position.",
        "The data is processed for membership record keeping, collection of dues and \
         representation of my interests as a union member.",
        "This consent remains valid for the duration of my membership and may be withdrawn by \
         written notice.",
        SIGNATURE_LINE,
    ],
};

static PAYMENT_DEDUCTION: DocumentTemplate = DocumentTemplate {
    kind: DocumentKind::PaymentDeduction,
    title: "Authorization to deduct membership dues",
    paragraphs: &[
        "To the employer: {{workplace}}",
        "I, {{full_name}}, position {{position}}, authorize my employer to withhold monthly \
         trade union membership dues of one percent of my salary and transfer them to the \
         account of {{organization_name}}.",
        "The authorization applies from the date of admission to the union until revoked in \
         writing.",
        SIGNATURE_LINE,
    ],
};

pub fn template_for(kind: DocumentKind) -> &'static DocumentTemplate {
    match kind {
        DocumentKind::MembershipApplication => &MEMBERSHIP_APPLICATION,
        DocumentKind::PersonalDataConsent => &PERSONAL_DATA_CONSENT,
        DocumentKind::PaymentDeduction => &PAYMENT_DEDUCTION,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template references unknown field '{0}'")]
    UnknownField(String),
    #[error("template has a malformed placeholder")]
    Malformed,
    #[error("placeholder pattern failed to compile: {0}")]
    Pattern(String),
}

/// A template with every placeholder resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub paragraphs: Vec<String>,
}

impl RenderedDocument {
    pub fn to_html(&self) -> String {
        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&self.title)));
        for paragraph in &self.paragraphs {
            html.push_str(&format!("<p>{}</p>\n", escape_html(paragraph)));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn or_unspecified(value: Option<&str>) -> String {
    value.unwrap_or(NOT_SPECIFIED).to_string()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Values available to every template for one application.
pub fn template_fields(
    application: &ApplicationRecord,
    organization_name: &str,
    issued_on: NaiveDate,
) -> BTreeMap<&'static str, String> {
    let applicant = &application.applicant;
    BTreeMap::from([
        ("application_id", application.id.0.clone()),
        ("organization_name", organization_name.to_string()),
        ("full_name", applicant.full_name()),
        ("birth_date", format_date(applicant.birth_date)),
        ("phone", applicant.phone.clone()),
        ("email", applicant.email.clone()),
        ("address", or_unspecified(applicant.address.as_deref())),
        ("workplace", or_unspecified(applicant.workplace.as_deref())),
        ("position", or_unspecified(applicant.position.as_deref())),
        (
            "hire_date",
            applicant
                .hire_date
                .map(format_date)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        ),
        ("issued_on", format_date(issued_on)),
    ])
}

static PLACEHOLDER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn placeholder() -> Result<&'static Regex, TemplateError> {
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}"))
        .as_ref()
        .map_err(|err| TemplateError::Pattern(err.to_string()))
}

/// Replace every `{{name}}` in `text` from `fields`.
pub fn interpolate(
    text: &str,
    fields: &BTreeMap<&'static str, String>,
) -> Result<String, TemplateError> {
    let pattern = placeholder()?;
    if pattern.replace_all(text, "").contains("{{") {
        return Err(TemplateError::Malformed);
    }

    let mut unknown = Vec::new();
    let output = pattern.replace_all(text, |caps: &Captures| match fields.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            unknown.push(caps[1].to_string());
            String::new()
        }
    });

    match unknown.into_iter().next() {
        Some(name) => Err(TemplateError::UnknownField(name)),
        None => Ok(output.into_owned()),
    }
}

impl DocumentTemplate {
    pub fn render(
        &self,
        fields: &BTreeMap<&'static str, String>,
    ) -> Result<RenderedDocument, TemplateError> {
        let paragraphs = self
            .paragraphs
            .iter()
            .map(|paragraph| interpolate(paragraph, fields))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RenderedDocument {
            kind: self.kind,
            title: interpolate(self.title, fields)?,
            paragraphs,
        })
    }
}

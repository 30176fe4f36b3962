//! Column table shared by CSV export and import.
//!
//! # Responsibility
//! - Fix the export column order and titles (the de facto wire format).
//! - Resolve an import header into column positions by name, with the
//!   legacy positional layout as fallback.

use super::tokenizer::Delimiter;
use std::collections::HashMap;

/// One attribute of the flat contact record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactColumn {
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    Company,
    JobTitle,
    Address,
    City,
    PostalCode,
    Country,
    Birthday,
    Website,
    Notes,
    CreatedAt,
    UpdatedAt,
}

/// Export column order.
pub const EXPORT_COLUMNS: [ContactColumn; 16] = [
    ContactColumn::Id,
    ContactColumn::FirstName,
    ContactColumn::LastName,
    ContactColumn::Email,
    ContactColumn::Phone,
    ContactColumn::Company,
    ContactColumn::JobTitle,
    ContactColumn::Address,
    ContactColumn::City,
    ContactColumn::PostalCode,
    ContactColumn::Country,
    ContactColumn::Birthday,
    ContactColumn::Website,
    ContactColumn::Notes,
    ContactColumn::CreatedAt,
    ContactColumn::UpdatedAt,
];

/// Positional import layout used when the header cannot be resolved by name.
/// Index 10 is reserved and never read.
pub const LEGACY_IMPORT_COLUMNS: [Option<ContactColumn>; 14] = [
    Some(ContactColumn::FirstName),
    Some(ContactColumn::LastName),
    Some(ContactColumn::Email),
    Some(ContactColumn::Phone),
    Some(ContactColumn::Company),
    Some(ContactColumn::JobTitle),
    Some(ContactColumn::Address),
    Some(ContactColumn::City),
    Some(ContactColumn::PostalCode),
    Some(ContactColumn::Country),
    None,
    Some(ContactColumn::Birthday),
    Some(ContactColumn::Website),
    Some(ContactColumn::Notes),
];

const REQUIRED_COLUMNS: [ContactColumn; 3] = [
    ContactColumn::FirstName,
    ContactColumn::LastName,
    ContactColumn::Email,
];

impl ContactColumn {
    /// Export header title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::FirstName => "Prénom",
            Self::LastName => "Nom",
            Self::Email => "Email",
            Self::Phone => "Téléphone",
            Self::Company => "Société",
            Self::JobTitle => "Poste",
            Self::Address => "Adresse",
            Self::City => "Ville",
            Self::PostalCode => "Code postal",
            Self::Country => "Pays",
            Self::Birthday => "Date de naissance",
            Self::Website => "Site web",
            Self::Notes => "Notes",
            Self::CreatedAt => "Date de création",
            Self::UpdatedAt => "Date de modification",
        }
    }

    // Normalized with `normalize_title`.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Id => &["id"],
            Self::FirstName => &["prénom", "prenom", "firstname", "givenname"],
            Self::LastName => &["nom", "lastname", "surname", "familyname", "nomdefamille"],
            Self::Email => &["email", "courriel", "mail", "emailaddress"],
            Self::Phone => &["téléphone", "telephone", "phone", "tel", "mobile"],
            Self::Company => &["société", "societe", "company", "entreprise", "organization"],
            Self::JobTitle => &["poste", "jobtitle", "fonction"],
            Self::Address => &["adresse", "address"],
            Self::City => &["ville", "city"],
            Self::PostalCode => &["codepostal", "postalcode", "zip", "zipcode"],
            Self::Country => &["pays", "country"],
            Self::Birthday => &["datedenaissance", "birthday", "birthdate", "dateofbirth"],
            Self::Website => &["siteweb", "website", "url"],
            Self::Notes => &["notes", "note", "commentaire", "comments"],
            Self::CreatedAt => &["datedecréation", "datedecreation", "createdat"],
            Self::UpdatedAt => &["datedemodification", "updatedat"],
        }
    }

    /// Resolves a header title, ignoring case, spacing and punctuation.
    pub fn from_title(title: &str) -> Option<Self> {
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            return None;
        }
        EXPORT_COLUMNS
            .into_iter()
            .find(|column| column.aliases().contains(&normalized.as_str()))
    }
}

/// Export header line without trailing newline.
pub fn export_header(delimiter: Delimiter) -> String {
    let separator = delimiter.as_char().to_string();
    EXPORT_COLUMNS
        .iter()
        .map(|column| column.title())
        .collect::<Vec<_>>()
        .join(&separator)
}

/// How a [`ColumnLayout`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSource {
    Header,
    Positional,
}

/// Column-to-position table for one import document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    positions: HashMap<ContactColumn, usize>,
    source: LayoutSource,
}

impl ColumnLayout {
    pub fn positional() -> Self {
        let positions = LEGACY_IMPORT_COLUMNS
            .iter()
            .enumerate()
            .filter_map(|(index, column)| column.map(|column| (column, index)))
            .collect();
        Self {
            positions,
            source: LayoutSource::Positional,
        }
    }

    /// Resolves header titles by name.
    ///
    /// Falls back to [`ColumnLayout::positional`] unless first name, last name
    /// and email all resolve. The first occurrence of a repeated title wins.
    pub fn from_header(titles: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (index, title) in titles.iter().enumerate() {
            if let Some(column) = ContactColumn::from_title(title) {
                positions.entry(column).or_insert(index);
            }
        }

        if REQUIRED_COLUMNS
            .iter()
            .all(|column| positions.contains_key(column))
        {
            Self {
                positions,
                source: LayoutSource::Header,
            }
        } else {
            Self::positional()
        }
    }

    pub fn position(&self, column: ContactColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn source(&self) -> LayoutSource {
        self.source
    }

    /// Minimum field count a record needs to carry every required column.
    pub fn required_width(&self) -> usize {
        REQUIRED_COLUMNS
            .iter()
            .filter_map(|column| self.position(*column))
            .max()
            .map_or(0, |index| index + 1)
    }
}

fn normalize_title(title: &str) -> String {
    title
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

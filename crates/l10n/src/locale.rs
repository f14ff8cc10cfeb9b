//! Locale identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::ParseLocaleError;

/// Canonical BCP 47 language identifier, e.g. `en`, `fr-CA` or `zh-Hant`.
///
/// Equality is value based on the canonical form, so `en-us` and `en-US`
/// compare equal once parsed. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleIdentifier(Arc<str>);

impl LocaleIdentifier {
	/// Parses and canonicalizes a locale code.
	pub fn parse(code: &str) -> Result<Self, ParseLocaleError> {
		let langid: LanguageIdentifier = code.parse().map_err(|source| ParseLocaleError {
			code: code.to_owned(),
			source,
		})?;
		Ok(Self(Arc::from(langid.to_string())))
	}

	/// Returns the canonical code.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the primary language subtag, `fr` for `fr-CA`.
	pub fn language(&self) -> &str {
		self.0.split('-').next().unwrap_or(&self.0)
	}
}

impl fmt::Display for LocaleIdentifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for LocaleIdentifier {
	type Err = ParseLocaleError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for LocaleIdentifier {
	type Error = ParseLocaleError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl From<LocaleIdentifier> for String {
	fn from(value: LocaleIdentifier) -> Self {
		value.0.to_string()
	}
}

impl From<SystemLanguage> for LocaleIdentifier {
	fn from(language: SystemLanguage) -> Self {
		Self(Arc::from(language.code()))
	}
}

macro_rules! system_languages {
	($($variant:ident => $code:literal,)*) => {
		/// Languages an operating system commonly reports, convertible into a
		/// [`LocaleIdentifier`] without parsing.
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		#[non_exhaustive]
		pub enum SystemLanguage {
			$(
				#[doc = concat!("`", $code, "`")]
				$variant,
			)*
		}

		impl SystemLanguage {
			/// Every language in declaration order.
			pub const ALL: &'static [SystemLanguage] = &[$(SystemLanguage::$variant,)*];

			/// Canonical locale code for this language.
			pub const fn code(self) -> &'static str {
				match self {
					$(SystemLanguage::$variant => $code,)*
				}
			}
		}
	};
}

system_languages! {
	Afrikaans => "af",
	Arabic => "ar",
	Basque => "eu",
	Belarusian => "be",
	Bulgarian => "bg",
	Catalan => "ca",
	Chinese => "zh",
	ChineseSimplified => "zh-Hans",
	ChineseTraditional => "zh-Hant",
	Czech => "cs",
	Danish => "da",
	Dutch => "nl",
	English => "en",
	Estonian => "et",
	Faroese => "fo",
	Finnish => "fi",
	French => "fr",
	German => "de",
	Greek => "el",
	Hebrew => "he",
	Hindi => "hi",
	Hungarian => "hu",
	Icelandic => "is",
	Indonesian => "id",
	Italian => "it",
	Japanese => "ja",
	Korean => "ko",
	Latvian => "lv",
	Lithuanian => "lt",
	Norwegian => "no",
	Polish => "pl",
	Portuguese => "pt",
	Romanian => "ro",
	Russian => "ru",
	SerboCroatian => "sh",
	Slovak => "sk",
	Slovenian => "sl",
	Spanish => "es",
	Swedish => "sv",
	Thai => "th",
	Turkish => "tr",
	Ukrainian => "uk",
	Vietnamese => "vi",
}

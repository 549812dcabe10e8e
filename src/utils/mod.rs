use email_address::EmailAddress;
use url::Url;

pub(crate) mod stack;

pub(crate) fn is_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

pub(crate) fn is_email(s: &str) -> bool {
    EmailAddress::is_valid(s)
}

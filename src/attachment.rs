//! Named binary or text payloads referenced from topic data through the
//! `xap:` link prefix.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use std::fmt;

/// Prefix marking an asset string as an attachment name rather than a URL.
pub const ATTACHMENT_LINK_PREFIX: &str = "xap:";

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Binary { mime: String, bytes: Vec<u8> },
    Text(String),
}

/// Produces display URLs for binary payloads and frees them again.
pub trait UrlMinter {
    fn mint(&mut self, mime: &str, bytes: &[u8]) -> String;
    fn revoke(&mut self, url: &str);
}

/// Inlines binary data as `data:` URLs; there is nothing to free.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlMinter;

impl UrlMinter for DataUrlMinter {
    fn mint(&mut self, mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }

    fn revoke(&mut self, _url: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    payload: Payload,
    url: Option<String>,
}

impl Attachment {
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Display handle: the minted URL for binary data, the text otherwise.
    pub fn url(&self) -> Option<&str> {
        match &self.payload {
            Payload::Binary { .. } => self.url.as_deref(),
            Payload::Text(text) => Some(text.as_str()),
        }
    }

    fn release(&mut self, minter: &mut dyn UrlMinter) {
        if let Some(url) = self.url.take() {
            minter.revoke(&url);
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url().unwrap_or_default())
    }
}

pub struct AttachmentCollection {
    items: IndexMap<String, Attachment>,
    minter: Box<dyn UrlMinter>,
    serial: u64,
}

impl fmt::Debug for AttachmentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentCollection")
            .field("items", &self.items.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for AttachmentCollection {
    fn default() -> Self {
        Self::new(Box::new(DataUrlMinter))
    }
}

impl AttachmentCollection {
    pub fn new(minter: Box<dyn UrlMinter>) -> Self {
        Self {
            items: IndexMap::new(),
            minter,
            serial: 0,
        }
    }

    pub fn item(&self, name: &str) -> Option<&Attachment> {
        self.items.get(name)
    }

    /// Stores `payload`, releasing whatever was stored under the same name.
    /// An empty or missing name is replaced by a generated one; the name in
    /// use is returned.
    pub fn set(&mut self, name: Option<&str>, payload: Payload) -> String {
        let name = match name.filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => self.generate_name(),
        };
        if let Some(mut old) = self.items.shift_remove(&name) {
            old.release(self.minter.as_mut());
        }
        let url = match &payload {
            Payload::Binary { mime, bytes } => Some(self.minter.mint(mime, bytes)),
            Payload::Text(_) => None,
        };
        tracing::debug!(name = %name, "attachment stored");
        self.items.insert(name.clone(), Attachment { payload, url });
        name
    }

    /// Deletes and releases `name`; unknown names are ignored.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.items.shift_remove(name) {
            Some(mut old) => {
                old.release(self.minter.as_mut());
                true
            }
            None => false,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &Attachment)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        for (_, mut item) in self.items.drain(..) {
            item.release(self.minter.as_mut());
        }
    }

    /// Resolves an `xap:` reference to its display URL.
    pub fn resolve(&self, src: &str) -> Option<String> {
        let name = src.strip_prefix(ATTACHMENT_LINK_PREFIX)?;
        self.item(name).and_then(|item| item.url().map(str::to_string))
    }

    fn generate_name(&mut self) -> String {
        loop {
            self.serial += 1;
            let uuid = uuid::Uuid::new_v4().simple().to_string();
            let name = format!("{}-{:x}", &uuid[..12], self.serial);
            if !self.items.contains_key(&name) {
                return name;
            }
        }
    }
}

impl Drop for AttachmentCollection {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Ledger {
        minted: Vec<String>,
        revoked: Vec<String>,
    }

    struct CountingMinter(Rc<RefCell<Ledger>>);

    impl UrlMinter for CountingMinter {
        fn mint(&mut self, _mime: &str, _bytes: &[u8]) -> String {
            let mut ledger = self.0.borrow_mut();
            let url = format!("blob:{}", ledger.minted.len());
            ledger.minted.push(url.clone());
            url
        }

        fn revoke(&mut self, url: &str) {
            self.0.borrow_mut().revoked.push(url.to_string());
        }
    }

    fn binary(bytes: &[u8]) -> Payload {
        Payload::Binary {
            mime: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn replacing_releases_the_previous_url_once() {
        let ledger = Rc::new(RefCell::new(Ledger::default()));
        let mut store = AttachmentCollection::new(Box::new(CountingMinter(ledger.clone())));
        store.set(Some("logo"), binary(b"one"));
        store.set(Some("logo"), binary(b"two"));
        assert_eq!(ledger.borrow().revoked, vec!["blob:0".to_string()]);
        assert_eq!(store.item("logo").and_then(|a| a.url()), Some("blob:1"));
        store.remove("logo");
        store.remove("logo");
        assert_eq!(ledger.borrow().revoked.len(), 2);
    }

    #[test]
    fn clear_and_drop_release_everything() {
        let ledger = Rc::new(RefCell::new(Ledger::default()));
        {
            let mut store = AttachmentCollection::new(Box::new(CountingMinter(ledger.clone())));
            store.set(Some("a"), binary(b"a"));
            store.set(Some("b"), Payload::Text("plain".into()));
            store.clear();
            assert!(store.is_empty());
            store.set(Some("c"), binary(b"c"));
        }
        assert_eq!(ledger.borrow().revoked, vec!["blob:0", "blob:1"]);
    }

    #[test]
    fn generated_names_and_prefix_resolution() {
        let mut store = AttachmentCollection::default();
        let name = store.set(None, Payload::Text("https://example.com/a.png".into()));
        assert!(!name.is_empty());
        assert_eq!(
            store.resolve(&format!("xap:{name}")).as_deref(),
            Some("https://example.com/a.png")
        );
        assert_eq!(store.resolve("https://example.com/a.png"), None);
        let bin = store.set(Some(""), binary(&[1, 2, 3]));
        assert_ne!(bin, name);
        assert_eq!(
            store.item(&bin).and_then(|a| a.url()),
            Some("data:image/png;base64,AQID")
        );
    }
}

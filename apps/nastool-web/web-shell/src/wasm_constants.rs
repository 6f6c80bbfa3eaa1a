pub(crate) const MODAL_CLASS: &str = "modal";
pub(crate) const MODAL_SHOWN_CLASS: &str = "show";
pub(crate) const MODAL_BACKDROP_CLASS: &str = "modal-backdrop";
pub(crate) const BODY_MODAL_OPEN_CLASS: &str = "modal-open";
pub(crate) const TOOLTIP_REFRESH_HOOK: &str = "fresh_tooltip";
pub(crate) const FILETREE_INIT_HOOK: &str = "init_filetree_element";
pub(crate) const SCROLL_UNBIND_HOOK: &str = "unbind_page_scroll";
pub(crate) const PROGRESS_GLOBAL: &str = "NProgress";
pub(crate) const MENU_UPDATE_METHOD: &str = "update_active";
pub(crate) const CONTENT_TITLE_SELECTOR: &str = "title";
pub(crate) const MENU_PAGE_SELECTOR: &str = "[data-lit-page]";
pub(crate) const MENU_PAGE_ATTRIBUTE: &str = "data-lit-page";

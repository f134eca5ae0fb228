pub mod film_list;
pub mod interaction;
pub mod views;

pub use film_list::{
    FilmList, ListMembership, ListPatch, ListStatus, MembershipInsert, MembershipKey, NewList,
    Visibility,
};
pub use interaction::{Interaction, InteractionChange, InteractionKey, RatingStats};
pub use views::{
    FilmSummary, InteractionView, ListDetailView, ListSummary, RatedFilmSummary, ReviewView,
    UserRecord, UserSummary,
};
